//! Time conversions at the snapshot boundary.
//!
//! Snapshots carry timestamps as seconds since the Unix epoch with a
//! fractional part. The engine compares in milliseconds and reports
//! ISO-8601 UTC strings.

use chrono::{DateTime, SecondsFormat, Utc};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Milliseconds elapsed between two epoch-second timestamps.
///
/// Negative when `then` lies after `now`.
#[must_use]
pub fn elapsed_millis(now: f64, then: f64) -> f64 {
    (now - then) * 1000.0
}

/// Convert epoch seconds into a UTC instant.
///
/// Returns `None` for non-finite input or values outside chrono's range.
#[must_use]
pub fn utc_from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = (((seconds - whole) * NANOS_PER_SECOND).round() as u32).min(999_999_999);

    #[allow(clippy::cast_possible_truncation)]
    DateTime::from_timestamp(whole as i64, nanos)
}

/// ISO-8601 rendering with microsecond precision and a `Z` suffix.
#[must_use]
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Epoch seconds rendered as ISO-8601, or `None` if not representable.
#[must_use]
pub fn format_epoch_seconds(seconds: f64) -> Option<String> {
    utc_from_epoch_seconds(seconds).map(format_utc)
}
