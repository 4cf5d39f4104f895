use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::retrieval::Metadata;

/// Fixed `[min, max]` range for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A calibration range must be finite with `min < max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// Fixed calibration ranges by metric; metrics not listed use per-batch ranges.
pub type CalibrationRanges = BTreeMap<String, MetricRange>;

/// A candidate whose metrics have been rescaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCandidate {
    pub id: String,
    pub values: BTreeMap<String, f64>,
    pub metadata: Metadata,
    /// Position in the retriever's output (0-based), used for tie-breaking.
    pub retrieval_rank: usize,
    /// `true` if any metric was missing and defaulted.
    pub partial_metrics: bool,
    /// Metrics that received the neutral default because they were missing.
    pub defaulted: Vec<String>,
}

impl NormalizedCandidate {
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Why a candidate was dropped before scoring.
pub enum DropReason {
    MissingId,
    DuplicateId,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingId => write!(f, "missing id"),
            DropReason::DuplicateId => write!(f, "duplicate id"),
        }
    }
}

/// A malformed candidate removed by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedCandidate {
    pub retrieval_rank: usize,
    pub id: String,
    pub reason: DropReason,
}

/// Result of normalizing one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationOutcome {
    pub candidates: Vec<NormalizedCandidate>,
    pub dropped: Vec<DroppedCandidate>,
    /// Ranges used per metric; `None` when no candidate carried the metric.
    pub ranges: BTreeMap<String, Option<MetricRange>>,
}

impl NormalizationOutcome {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
