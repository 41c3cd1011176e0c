use chrono::{DateTime, FixedOffset, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ%z";

pub fn create_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Render milliseconds since the epoch in local time, e.g. `2013-03-04T12:30:00Z+0100`.
///
/// The literal `Z` followed by the numeric offset is what the collector parses.
/// Returns `None` for timestamps chrono cannot represent.
pub fn format_timestamp(millis: i64) -> Option<String> {
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(utc.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string())
}

/// [`format_timestamp`] with an explicit offset.
pub fn format_timestamp_in(millis: i64, offset: FixedOffset) -> Option<String> {
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(offset.from_utc_datetime(&utc.naive_utc()).format(TIMESTAMP_FORMAT).to_string())
}

/// Current time in milliseconds since the epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
