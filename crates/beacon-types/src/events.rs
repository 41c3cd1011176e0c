use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body text used when a response arrived but could not be read.
pub const PARSE_FAILURE_MARKER: &str = "Failed parsing response";

/// Platform permissions the agent cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Required: no request is attempted without it.
    Internet,
    /// Optional: improves identity quality when granted.
    AccessWifiState,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internet => write!(f, "INTERNET"),
            Self::AccessWifiState => write!(f, "ACCESS_WIFI_STATE"),
        }
    }
}

/// Why a delivery did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// A required platform permission is missing. The request was not attempted.
    #[error("missing {0} permission")]
    Permission(Permission),

    /// The network could not be reached at all.
    #[error("no connectivity: {0}")]
    Connectivity(String),

    /// Parameters could not be serialized. The request was not attempted.
    #[error("failed to encode parameters: {0}")]
    Encoding(String),

    /// The request was sent (or attempted) but no response could be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-2xx status.
    #[error("server responded {status}: {body}")]
    Server { status: u16, body: String },
}

impl DeliveryError {
    /// Text appended to the caller's failure message.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Permission(p) => format!(
                "Missing {} permission. You might need to adjust your manifest",
                p
            ),
            Self::Connectivity(cause) => format!(
                "No connectivity: {}. Check that the app holds the INTERNET permission",
                cause
            ),
            Self::Encoding(cause) => format!("Failed to encode parameters: {}", cause),
            Self::Transport(cause) => format!("Request failed: {}", cause),
            Self::Server { body, .. } => body.clone(),
        }
    }

    /// True when the request never left the device.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Permission(_) | Self::Encoding(_))
    }
}

/// Terminal result of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    Failure(DeliveryError),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Render the message surfaced to the caller.
    ///
    /// Success returns the success template untouched; failures append the
    /// diagnostic in parentheses.
    pub fn message(&self, success_message: &str, failure_message: &str) -> String {
        match self {
            Self::Success => success_message.to_string(),
            Self::Failure(e) => format!("{} ({})", failure_message, e.diagnostic()),
        }
    }
}

/// Lifecycle of a single delivery task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeliveryState {
    Created = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Created,
        }
    }
}

/// What the completion sink receives once a task reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub path: String,
    pub outcome: DeliveryOutcome,
    pub message: String,
}
