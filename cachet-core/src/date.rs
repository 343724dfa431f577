//! HTTP-date helpers.
//!
//! HTTP dates (RFC 1123, always GMT) have one-second resolution and cover
//! 1970 through 9999. Formatting outside that range is an error here rather
//! than a panic inside `httpdate`.

use crate::error::{Error, Result};
use std::time::{Duration, SystemTime};

/// Last second representable as an HTTP-date (9999-12-31T23:59:59Z).
pub const MAX_HTTP_DATE_SECS: u64 = 253_402_300_799;

/// Whole seconds since the Unix epoch, if `time` is inside the HTTP-date range.
pub fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
        .filter(|secs| *secs <= MAX_HTTP_DATE_SECS)
}

/// Drop sub-second precision.
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => SystemTime::UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => time,
    }
}

/// Format `time` as an IMF-fixdate, e.g. `Tue, 14 Nov 2023 22:13:20 GMT`.
pub fn format_http_date(time: SystemTime) -> Result<String> {
    match unix_secs(time) {
        Some(_) => Ok(httpdate::fmt_http_date(time)),
        None => Err(Error::InvalidDate(format!(
            "{:?} is outside the HTTP-date range",
            time
        ))),
    }
}

/// Parse any of the three HTTP-date formats. Malformed input yields `None`.
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value.trim()).ok()
}
