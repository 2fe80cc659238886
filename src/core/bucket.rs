//! UTC bucket keys and timestamp parsing

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::consts::{DAY_FORMAT, HOUR_FORMAT};

/// Derive `(day, hour)` bucket keys for an epoch-ms timestamp, always in UTC
pub(crate) fn utc_buckets(ts: i64) -> Option<(String, String)> {
    let dt = DateTime::<Utc>::from_timestamp_millis(ts)?;
    Some((
        dt.format(DAY_FORMAT).to_string(),
        dt.format(HOUR_FORMAT).to_string(),
    ))
}

/// Interpret a JSON value as epoch milliseconds.
///
/// Accepts numbers, numeric strings and RFC 3339 strings.
pub(crate) fn epoch_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => finite_ms(n.as_f64()?),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<f64>() {
                return finite_ms(n);
            }
            trimmed
                .parse::<DateTime<Utc>>()
                .ok()
                .map(|dt| dt.timestamp_millis())
        }
        _ => None,
    }
}

fn finite_ms(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}
