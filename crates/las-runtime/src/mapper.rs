//! Controller record → domain resource.

use chrono::{DateTime, Utc};
use las_types::{LockResource, LockStatus};
use tracing::debug;

/// Translate a controller status code into the domain vocabulary.
///
/// 200 → `ukjent`, 503 → `feil`, anything else → its decimal form.
pub fn map_status(code: i32) -> String {
    match code {
        200 => "ukjent".to_string(),
        503 => "feil".to_string(),
        other => other.to_string(),
    }
}

/// Convert fractional Unix seconds to whole milliseconds, truncating toward
/// zero in decimal.
///
/// Works on the shortest decimal text that round-trips to `seconds` (the
/// number as the controller wrote it), so `1.0009996` is 1000 and `5.001` is
/// 5001. Values beyond `i64` saturate.
fn seconds_to_millis(seconds: f64) -> i64 {
    let text = seconds.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let sub_second: String = fraction.chars().chain("000".chars()).take(3).collect();
    let magnitude = format!("{whole}{sub_second}").parse::<i64>().unwrap_or(i64::MAX);
    if seconds.is_sign_negative() {
        magnitude.saturating_neg()
    } else {
        magnitude
    }
}

fn timestamp_from_seconds(seconds: f64) -> DateTime<Utc> {
    let millis = seconds_to_millis(seconds);
    DateTime::from_timestamp_millis(millis).unwrap_or(if millis < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Build the domain resource for door `name`.
pub fn to_lock_resource(name: &str, raw: &LockStatus) -> LockResource {
    let resource = LockResource {
        system_id: name.to_string(),
        status: map_status(raw.status),
        last_seen_at: raw.last_seen.map(timestamp_from_seconds),
    };
    debug!(?resource, "Las");
    resource
}
