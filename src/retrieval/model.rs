use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form document metadata, echoed back in results.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Retrieval filters: payload field name to required value.
pub type Filters = BTreeMap<String, serde_json::Value>;

/// A document returned by retrieval for one request.
///
/// `raw_fields` holds un-normalized metric values keyed by metric name. A metric
/// that is absent here is treated as missing by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub id: String,
    #[serde(default)]
    pub raw_fields: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CandidateDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.raw_fields.insert(metric.into(), value);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Returns the raw value for `metric` if present and finite.
    pub fn raw(&self, metric: &str) -> Option<f64> {
        self.raw_fields
            .get(metric)
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Returns `true` if every filter matches the metadata by equality.
    ///
    /// Array filters match when the metadata value equals any element.
    pub fn matches_filters(&self, filters: &Filters) -> bool {
        filters.iter().all(|(key, wanted)| {
            let Some(actual) = self.metadata.get(key) else {
                return false;
            };
            match wanted {
                serde_json::Value::Array(options) => options.iter().any(|o| o == actual),
                other => other == actual,
            }
        })
    }
}
