//! Seed data: the inbound correspondence set as a JSON array.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::error::SeedError;

use super::model::Correspondence;

/// Parse a JSON array of correspondence records.
pub fn parse_seed(json: &str) -> Result<Vec<Correspondence>, SeedError> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a seed file.
pub async fn load_seed(path: &Path) -> Result<Vec<Correspondence>, SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let items = parse_seed(&raw)?;
    info!(path = %path.display(), count = items.len(), "Loaded seed correspondence");
    Ok(items)
}

/// Parse an ISO-8601 instant. Accepts full RFC 3339, a local date-time
/// without offset (taken as UTC), or a bare date (midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }
    Err(format!("not an ISO-8601 instant: {}", raw))
}

pub(crate) fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_instant<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_instant(&raw).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
