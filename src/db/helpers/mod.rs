use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Parse one of the closed enums stored as snake_case text.
pub fn parse_enum<T>(value: &str, field: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("invalid {field} column"))
}

pub fn to_match_score(value: i64) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|score| *score <= 100)
        .ok_or_else(|| anyhow!("match_score contains out-of-range value {value}"))
}

pub fn to_revenue(value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(revenue) if !revenue.is_finite() || revenue < 0.0 => {
            Err(anyhow!("estimated_revenue contains invalid value {revenue}"))
        }
        other => Ok(other),
    }
}
