/// Beacon Agent
///
/// Client-side attribution agent: builds a device fingerprint, keeps a
/// per-install synthetic identity, encodes event parameters and delivers them
/// to the collector on a background task.
///
/// The host supplies an `EnvironmentSnapshot`, a `PreferenceStore` and
/// optionally permission/advertising probes. Everything else lives here.

pub mod codec;
pub mod config;
pub mod delivery;
pub mod fingerprint;
pub mod identity;
pub mod platform;
pub mod sanitize;
pub mod util;

pub use codec::{EncodedBody, FormCharset, PayloadFormat};
pub use config::AgentConfig;
pub use delivery::{ChannelSink, CompletionSink, DeliveryHandle, DeliveryProgress, DeliveryTask};
pub use fingerprint::Fingerprint;
pub use identity::{DeviceIdentityStore, IdentityDigests};
pub use platform::{AdvertisingIdSource, AdvertisingInfo, GrantAll, PermissionProbe};
