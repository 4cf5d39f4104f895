use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors raised while building or loading intent weight profiles.
pub enum ProfileError {
    /// Profile name was empty after trimming.
    #[error("profile intent name must not be empty")]
    EmptyIntent,

    /// Profile declared no weights.
    #[error("profile '{intent}' has no weights")]
    NoWeights {
        /// Profile name.
        intent: String,
    },

    /// A metric name was empty.
    #[error("profile '{intent}' contains an empty metric name")]
    EmptyMetricName {
        /// Profile name.
        intent: String,
    },

    /// A metric name collides with a key of the serialized result object.
    #[error("profile '{intent}' uses reserved metric name '{metric}'")]
    ReservedMetric {
        /// Profile name.
        intent: String,
        /// Offending metric.
        metric: String,
    },

    /// A weight was negative or not finite.
    #[error("profile '{intent}' has invalid weight {weight} for '{metric}'")]
    InvalidWeight {
        /// Profile name.
        intent: String,
        /// Offending metric.
        metric: String,
        /// Offending weight.
        weight: f64,
    },

    /// Weights summed to zero and cannot be rescaled.
    #[error("profile '{intent}' weights sum to zero")]
    ZeroWeightSum {
        /// Profile name.
        intent: String,
    },

    /// Two profiles share a name.
    #[error("duplicate profile '{intent}'")]
    DuplicateProfile {
        /// Profile name.
        intent: String,
    },

    /// The configured default profile does not exist.
    #[error("default profile '{name}' is not defined")]
    UnknownDefault {
        /// Configured default.
        name: String,
    },

    /// A calibration range was empty, inverted or not finite.
    #[error("invalid calibration range for '{metric}': min={min}, max={max}")]
    InvalidRange {
        /// Metric name.
        metric: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// The ranking configuration file could not be read.
    #[error("failed to read ranking config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The ranking configuration was not valid JSON for the expected shape.
    #[error("failed to parse ranking config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;
