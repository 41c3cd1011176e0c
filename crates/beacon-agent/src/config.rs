use std::time::Duration;

use beacon_types::Locale;
use tracing::warn;

use crate::codec::FormCharset;

pub const DEFAULT_BASE_URL: &str = "https://app.beacon-collector.io";
pub const DEFAULT_CLIENT_SDK: &str = concat!("rust", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_PREFS_NAMESPACE: &str = "beacon";

/// Settings shared by every delivery task in a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Collector root; request paths are appended verbatim.
    pub base_url: String,
    /// Value of the `Client-SDK` header.
    pub client_sdk: String,
    /// Value of the `Accept-Language` header.
    pub accept_language: String,
    /// `None` leaves the transport's own timeout behavior in place.
    pub timeout: Option<Duration>,
    pub form_charset: FormCharset,
    pub prefs_namespace: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_sdk: DEFAULT_CLIENT_SDK.to_string(),
            accept_language: default_language(),
            timeout: None,
            form_charset: FormCharset::Latin1,
            prefs_namespace: DEFAULT_PREFS_NAMESPACE.to_string(),
        }
    }
}

impl AgentConfig {
    /// Read `BEACON_*` variables, keeping defaults for anything unset or invalid.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AgentConfig::from_env`], reading through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("BEACON_BASE_URL").filter(|v| !v.is_empty()) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(sdk) = lookup("BEACON_CLIENT_SDK").filter(|v| !v.is_empty()) {
            config.client_sdk = sdk;
        }
        if let Some(language) = lookup("BEACON_ACCEPT_LANGUAGE").filter(|v| !v.is_empty()) {
            config.accept_language = language;
        } else if let Some(language) = ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|key| lookup(*key))
            .map(|name| Locale::from_posix(&name).language)
            .find(|language| !language.is_empty())
        {
            config.accept_language = language;
        }
        if let Some(raw) = lookup("BEACON_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(0) => config.timeout = None,
                Ok(secs) => config.timeout = Some(Duration::from_secs(secs)),
                Err(_) => warn!("Ignoring invalid BEACON_TIMEOUT_SECS={}", raw),
            }
        }
        if let Some(raw) = lookup("BEACON_FORM_CHARSET") {
            match FormCharset::from_name(&raw) {
                Some(charset) => config.form_charset = charset,
                None => warn!("Ignoring unsupported BEACON_FORM_CHARSET={}", raw),
            }
        }
        if let Some(namespace) = lookup("BEACON_PREFS_NAMESPACE").filter(|v| !v.is_empty()) {
            config.prefs_namespace = namespace;
        }

        config
    }

    /// Full URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Language of the process locale, `en` when none is set.
fn default_language() -> String {
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|name| Locale::from_posix(&name).language)
        .find(|language| !language.is_empty())
        .unwrap_or_else(|| "en".to_string())
}
