//! Fallback-chain resolution of loosely shaped backend records.
//!
//! Backends send the same concept under different key names. Each logical
//! field is declared once as a [`FieldSpec`] with its accepted source keys in
//! priority order; the first key holding a usable value wins. `null` counts
//! as absent, and so does a value of the wrong type, so resolution falls
//! through to the next key and finally to the caller's default.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// A logical field and the ordered list of source keys it may arrive under.
///
/// Keys containing `.` address nested objects (`"problem.title"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub keys: &'static [&'static str],
}

impl FieldSpec {
    pub const fn new(name: &'static str, keys: &'static [&'static str]) -> Self {
        Self { name, keys }
    }

    /// Resolve the field with a converter, trying keys in order.
    pub fn resolve<'a, T>(
        &self,
        record: &'a Value,
        convert: impl Fn(&'a Value) -> Option<T>,
    ) -> Option<T> {
        self.keys
            .iter()
            .filter_map(|key| lookup_path(record, key))
            .find_map(convert)
    }

    /// First non-null raw value, whatever its type.
    pub fn raw<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.resolve(record, Some)
    }

    pub fn string(&self, record: &Value) -> Option<String> {
        self.resolve(record, as_string)
    }

    pub fn string_or(&self, record: &Value, default: &str) -> String {
        self.string(record).unwrap_or_else(|| default.to_string())
    }

    pub fn count(&self, record: &Value) -> Option<u32> {
        self.resolve(record, as_count)
    }

    pub fn number(&self, record: &Value) -> Option<f64> {
        self.resolve(record, as_number)
    }

    pub fn timestamp(&self, record: &Value) -> Option<DateTime<Utc>> {
        self.resolve(record, as_timestamp)
    }

    pub fn array<'a>(&self, record: &'a Value) -> Option<&'a Vec<Value>> {
        self.resolve(record, Value::as_array)
    }

    pub fn boolean(&self, record: &Value) -> Option<bool> {
        self.resolve(record, Value::as_bool)
    }
}

fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

/// Strings are taken as-is; numbers are rendered, since ids arrive as both.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative integer, accepting whole floats and numeric strings.
pub fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .map(|n| n.min(u32::MAX as u64) as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// RFC 3339, naive ISO-8601 (taken as UTC), or a unix epoch in seconds or
/// milliseconds.
pub fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
        }
        Value::Number(n) => {
            let epoch = n.as_i64()?;
            if epoch.abs() >= 1_000_000_000_000 {
                Utc.timestamp_millis_opt(epoch).single()
            } else {
                Utc.timestamp_opt(epoch, 0).single()
            }
        }
        _ => None,
    }
}

/// Pick the first of `keys` holding a non-empty string, used for server error
/// messages (`detail`, `message`, ...).
pub fn first_message(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup_path(body, key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
