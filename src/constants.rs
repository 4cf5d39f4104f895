//! Cross-cutting, shared constants.
//!
//! Metric names are the keys shared by the retrieval adapter (raw fields), the
//! normalizer, weight profiles and the serialized result shape. Keep them in one
//! place so the stages cannot drift apart.

pub const METRIC_SIMILARITY: &str = "similarity";
pub const METRIC_DOC_QUALITY: &str = "doc_quality";
pub const METRIC_RECENCY: &str = "recency";
pub const METRIC_POPULARITY: &str = "popularity";

/// The four signals every built-in profile weighs.
pub const STANDARD_METRICS: [&str; 4] = [
    METRIC_SIMILARITY,
    METRIC_DOC_QUALITY,
    METRIC_RECENCY,
    METRIC_POPULARITY,
];

/// Keys used by the serialized result object; a metric may not take one of these names.
pub const RESERVED_RESULT_KEYS: [&str; 5] =
    ["id", "hybrid_score", "rank", "partial_metrics", "metadata"];

/// Value assigned to a metric that is missing or has no spread within the batch.
pub const NEUTRAL_METRIC_VALUE: f64 = 0.5;

/// Weight sums within this distance of 1.0 are kept verbatim.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Relative tolerance for treating a batch min and max as equal.
pub const DEGENERATE_RANGE_TOLERANCE: f64 = 1e-9;

pub const DEFAULT_PROFILE_NAME: &str = "default";

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
pub const DEFAULT_ADMISSION_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_RETRIEVAL_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Returns `true` if `a` and `b` are equal up to [`DEGENERATE_RANGE_TOLERANCE`].
pub fn approx_equal(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= DEGENERATE_RANGE_TOLERANCE * scale
}
