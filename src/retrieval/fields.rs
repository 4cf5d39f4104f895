//! Raw metric extraction from catalog payloads.
//!
//! Catalog entries come from several sources and name the same signal
//! differently, so each metric is read from the first present of a list of
//! aliases. Values that cannot be read are left out entirely; the normalizer
//! treats them as missing.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::constants::{METRIC_DOC_QUALITY, METRIC_POPULARITY, METRIC_RECENCY, METRIC_SIMILARITY};

use super::model::Metadata;

pub const DOC_QUALITY_KEYS: &[&str] = &["doc_quality", "quality", "score", "rating", "stars"];

pub const POPULARITY_KEYS: &[&str] = &[
    "popularity",
    "usage_count",
    "uses",
    "downloads",
    "stars",
    "forks",
];

pub const RECENCY_KEYS: &[&str] = &[
    "last_updated",
    "updated_at",
    "modified",
    "last_modified",
    "updated",
];

pub const ID_KEYS: &[&str] = &["id", "doc_id", "api_id"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];

/// Builds the raw metric map for one search hit.
pub fn extract_raw_fields(metadata: &Metadata, similarity: Option<f64>) -> BTreeMap<String, f64> {
    let mut fields = BTreeMap::new();

    if let Some(sim) = similarity.filter(|s| s.is_finite()) {
        fields.insert(METRIC_SIMILARITY.to_string(), sim);
    }
    if let Some(v) = first_number(metadata, DOC_QUALITY_KEYS) {
        fields.insert(METRIC_DOC_QUALITY.to_string(), v);
    }
    if let Some(v) = first_number(metadata, POPULARITY_KEYS) {
        fields.insert(METRIC_POPULARITY.to_string(), v);
    }
    if let Some(v) = first_timestamp(metadata, RECENCY_KEYS) {
        fields.insert(METRIC_RECENCY.to_string(), v);
    }

    fields
}

/// Document id from the payload, if it carries one.
pub fn payload_id(metadata: &Metadata) -> Option<String> {
    ID_KEYS.iter().find_map(|key| match metadata.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First key in `keys` whose value reads as a finite number.
pub fn first_number(metadata: &Metadata, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(as_number)
}

/// First key in `keys` whose value reads as a timestamp, in epoch seconds.
pub fn first_timestamp(metadata: &Metadata, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .find_map(as_timestamp)
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_timestamp(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) => as_number(value),
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

/// Parses a date or date-time string to epoch seconds (UTC when no offset is given).
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(n) = raw.parse::<f64>() {
        return n.is_finite().then_some(n);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(epoch_seconds(dt.timestamp(), dt.timestamp_subsec_millis()));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            let dt = dt.and_utc();
            return Some(epoch_seconds(dt.timestamp(), dt.timestamp_subsec_millis()));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            let dt = date.and_hms_opt(0, 0, 0)?.and_utc();
            return Some(dt.timestamp() as f64);
        }
    }

    None
}

fn epoch_seconds(secs: i64, millis: u32) -> f64 {
    secs as f64 + f64::from(millis) / 1000.0
}
