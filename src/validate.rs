//! Parameter validation shared by every report request.
//!
//! All checks run synchronously before a URL is assembled.

use crate::error::{MetrikaError, Result};
use chrono::NaiveDate;

/// Maximum number of metrics the reporting API accepts per request.
pub const MAX_METRICS: usize = 20;

/// Maximum number of dimensions the reporting API accepts per request.
pub const MAX_DIMENSIONS: usize = 10;

/// Upper bound for `top_keys` on the time-series surface.
pub const MAX_TOP_KEYS: u32 = 30;

/// Time grouping values accepted by the time-series surface.
pub const GROUPS: &[&str] = &[
    "all",
    "auto",
    "minute",
    "minutes_10",
    "minutes_15",
    "hour",
    "hours_4",
    "day",
    "week",
    "month",
    "quarter",
    "year",
];

/// Validate a counter identifier.
pub fn counter_id(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MetrikaError::invalid("counter_id must be a non-empty string"));
    }
    Ok(())
}

/// Validate a `YYYY-MM-DD` date that must also exist on the calendar.
pub fn date(name: &str, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shaped {
        return Err(MetrikaError::invalid(format!(
            "{name} must match YYYY-MM-DD, got '{value}'"
        )));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        MetrikaError::invalid(format!("{name} is not a valid calendar date: '{value}'"))
    })?;

    Ok(())
}

/// Validate an optional date.
pub fn optional_date(name: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => date(name, v),
        None => Ok(()),
    }
}

/// Validate a metric list: 1 to [`MAX_METRICS`] non-empty entries.
pub fn metrics(values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Err(MetrikaError::invalid("metrics must contain at least 1 entry"));
    }
    if values.len() > MAX_METRICS {
        return Err(MetrikaError::invalid(format!(
            "metrics must contain at most {MAX_METRICS} entries, got {}",
            values.len()
        )));
    }
    non_blank("metrics", values)
}

/// Validate a dimension list: 0 to [`MAX_DIMENSIONS`] non-empty entries.
pub fn dimensions(values: &[String]) -> Result<()> {
    if values.len() > MAX_DIMENSIONS {
        return Err(MetrikaError::invalid(format!(
            "dimensions must contain at most {MAX_DIMENSIONS} entries, got {}",
            values.len()
        )));
    }
    non_blank("dimensions", values)
}

/// Validate `top_keys` on the time-series surface.
pub fn top_keys(value: u32) -> Result<()> {
    if value == 0 || value > MAX_TOP_KEYS {
        return Err(MetrikaError::invalid(format!(
            "top_keys must be between 1 and {MAX_TOP_KEYS}, got {value}"
        )));
    }
    Ok(())
}

/// Validate a time grouping value.
pub fn group(value: &str) -> Result<()> {
    if GROUPS.contains(&value) {
        Ok(())
    } else {
        Err(MetrikaError::invalid(format!(
            "group '{value}' is not one of: {}",
            GROUPS.join(", ")
        )))
    }
}

/// Validate a minimum page depth.
pub fn min_depth(value: u32) -> Result<()> {
    if value == 0 {
        return Err(MetrikaError::invalid("min_depth must be at least 1"));
    }
    Ok(())
}

/// Validate that a list of literals is non-empty when supplied.
pub fn non_empty_list<T>(name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(MetrikaError::invalid(format!(
            "{name} must contain at least 1 entry"
        )));
    }
    Ok(())
}

/// Validate an ISO 4217 currency code such as `RUB`.
pub fn currency(value: &str) -> Result<()> {
    if value.len() != 3 || !value.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(MetrikaError::invalid(format!(
            "currency '{value}' must be a three-letter ISO 4217 code"
        )));
    }
    Ok(())
}

fn non_blank(name: &str, values: &[String]) -> Result<()> {
    if let Some(pos) = values.iter().position(|v| v.trim().is_empty()) {
        return Err(MetrikaError::invalid(format!(
            "{name}[{pos}] must be a non-empty string"
        )));
    }
    Ok(())
}
