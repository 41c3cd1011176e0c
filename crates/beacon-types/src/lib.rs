/// Beacon shared types.
///
/// Data exchanged between the identity, fingerprint and delivery layers.
/// Kept free of I/O so every crate in the workspace can depend on it.

pub mod events;
pub mod models;
pub mod params;

pub use events::{
    DeliveryError, DeliveryOutcome, DeliveryReport, DeliveryState, PARSE_FAILURE_MARKER, Permission,
};
pub use models::{DisplayMetrics, EnvironmentSnapshot, Locale};
pub use params::RequestParameters;
