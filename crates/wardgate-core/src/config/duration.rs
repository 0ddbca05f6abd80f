//! Human-readable duration values (`"30m"`, `"1h"`, `"45s"`, `"7d"`).
//!
//! Used as a `#[serde(with = ...)]` module by configuration structs so that
//! both TOML files and environment variables can express durations the
//! same way. A bare number means seconds.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

/// Parse a duration string such as `"30m"` or `"90"`.
pub fn parse(value: &str) -> Result<Duration, String> {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return Err("empty duration".to_string());
    }

    let (number, unit) = match value.find(|c: char| c.is_alphabetic()) {
        Some(pos) => (value[..pos].trim(), value[pos..].trim()),
        None => (value.as_str(), "s"),
    };

    let number = number
        .parse::<u64>()
        .map_err(|e| format!("expected a number in duration '{value}': {e}"))?;

    let scale: u64 = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hour" | "hours" => 60 * 60,
        "d" | "day" | "days" => 24 * 60 * 60,
        other => {
            return Err(format!(
                "unknown duration unit '{other}' in '{value}' (supported: s, m, h, d)"
            ));
        }
    };
    let seconds = number
        .checked_mul(scale)
        .ok_or_else(|| format!("duration '{value}' is too large"))?;

    Ok(Duration::from_secs(seconds))
}

/// Render a duration in the largest unit that divides it exactly.
pub fn format(duration: &Duration) -> String {
    let secs = duration.as_secs();
    if secs != 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs != 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(duration))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration such as \"30m\" or a number of seconds")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_secs(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_secs)
            .map_err(|_| E::custom(format!("negative duration: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse(v).map_err(E::custom)
    }
}
