use serde::{Deserialize, Serialize};

/// Raw environment readings supplied by the host platform layer.
///
/// Every field is optional in spirit: missing strings stay `None` and are
/// replaced by fallback tokens when the fingerprint is built. Numeric fields
/// use `0` for "not reported".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSnapshot {
    pub package_name: Option<String>,
    /// `None` when the package manager could not resolve the running package.
    pub app_version: Option<String>,
    pub device_model: Option<String>,
    pub os_version: Option<String>,
    pub locale: Locale,
    /// Platform screen layout bits (size class in the low nibble, long flag in bits 4-5).
    pub screen_layout: u32,
    pub display: DisplayMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

impl Locale {
    pub fn new(language: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            country: country.into(),
        }
    }

    /// Parse a POSIX locale name such as `en_US.UTF-8` or `de_DE@euro`.
    ///
    /// `C` and `POSIX` carry no language and map to an empty locale.
    pub fn from_posix(name: &str) -> Self {
        let name = name.split(['.', '@']).next().unwrap_or_default();
        if name == "C" || name == "POSIX" {
            return Self::default();
        }
        let mut parts = name.splitn(2, ['_', '-']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let country = parts.next().unwrap_or_default().to_ascii_uppercase();
        Self { language, country }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMetrics {
    pub density_dpi: u32,
    pub width_pixels: u32,
    pub height_pixels: u32,
}
