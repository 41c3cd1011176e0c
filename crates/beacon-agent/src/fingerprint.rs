//! Client signature sent as the `User-Agent` of every request.
//!
//! Thirteen sanitized fields joined by single spaces. The order is part of the
//! collector's schema and must not change.

use std::fmt;

use beacon_types::{DisplayMetrics, EnvironmentSnapshot};

use crate::sanitize::{UNKNOWN, sanitize_long, sanitize_short};

pub const OS_NAME: &str = "android";

// Screen layout bits reported by the platform.
const SCREENLAYOUT_SIZE_MASK: u32 = 0x0f;
const SCREENLAYOUT_SIZE_SMALL: u32 = 0x01;
const SCREENLAYOUT_SIZE_NORMAL: u32 = 0x02;
const SCREENLAYOUT_SIZE_LARGE: u32 = 0x03;
const SCREENLAYOUT_SIZE_XLARGE: u32 = 0x04;
const SCREENLAYOUT_LONG_MASK: u32 = 0x30;
const SCREENLAYOUT_LONG_NO: u32 = 0x10;
const SCREENLAYOUT_LONG_YES: u32 = 0x20;

// Reference densities (dpi).
const DENSITY_LOW: u32 = 120;
const DENSITY_MEDIUM: u32 = 160;
const DENSITY_HIGH: u32 = 240;

pub const FIELD_COUNT: usize = 13;

/// Sanitized fingerprint fields in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    fields: [String; FIELD_COUNT],
}

impl Fingerprint {
    pub fn from_snapshot(snapshot: &EnvironmentSnapshot) -> Self {
        let layout = snapshot.screen_layout;
        let display = &snapshot.display;
        Self {
            fields: [
                sanitize_long(snapshot.package_name.as_deref()),
                sanitize_long(snapshot.app_version.as_deref()),
                device_type(layout).to_string(),
                sanitize_long(snapshot.device_model.as_deref()),
                OS_NAME.to_string(),
                sanitize_long(snapshot.os_version.as_deref()),
                sanitize_short(Some(snapshot.locale.language.as_str())),
                sanitize_short(Some(snapshot.locale.country.as_str())),
                screen_size(layout).to_string(),
                screen_format(layout).to_string(),
                screen_density(display).to_string(),
                sanitize_long(Some(display.width_pixels.to_string().as_str())),
                sanitize_long(Some(display.height_pixels.to_string().as_str())),
            ],
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(" "))
    }
}

/// Build the space-joined signature for `snapshot`. Pure and deterministic.
pub fn build(snapshot: &EnvironmentSnapshot) -> String {
    Fingerprint::from_snapshot(snapshot).to_string()
}

pub fn device_type(screen_layout: u32) -> &'static str {
    match screen_layout & SCREENLAYOUT_SIZE_MASK {
        SCREENLAYOUT_SIZE_SMALL | SCREENLAYOUT_SIZE_NORMAL => "phone",
        SCREENLAYOUT_SIZE_LARGE | SCREENLAYOUT_SIZE_XLARGE => "tablet",
        _ => UNKNOWN,
    }
}

pub fn screen_size(screen_layout: u32) -> &'static str {
    match screen_layout & SCREENLAYOUT_SIZE_MASK {
        SCREENLAYOUT_SIZE_SMALL => "small",
        SCREENLAYOUT_SIZE_NORMAL => "normal",
        SCREENLAYOUT_SIZE_LARGE => "large",
        SCREENLAYOUT_SIZE_XLARGE => "xlarge",
        _ => UNKNOWN,
    }
}

pub fn screen_format(screen_layout: u32) -> &'static str {
    match screen_layout & SCREENLAYOUT_LONG_MASK {
        SCREENLAYOUT_LONG_YES => "long",
        SCREENLAYOUT_LONG_NO => "normal",
        _ => UNKNOWN,
    }
}

/// Bucket a density, splitting at the midpoints between the reference densities.
pub fn screen_density(display: &DisplayMetrics) -> &'static str {
    let density = display.density_dpi;
    let low = (DENSITY_MEDIUM + DENSITY_LOW) / 2;
    let high = (DENSITY_MEDIUM + DENSITY_HIGH) / 2;

    if density == 0 {
        UNKNOWN
    } else if density < low {
        "low"
    } else if density > high {
        "high"
    } else {
        "medium"
    }
}
