//! Min–max normalization of heterogeneous raw metrics into `[0, 1]`.
//!
//! Ranges come from the current batch unless a fixed calibration range is
//! configured for the metric. Missing values and zero-spread metrics receive the
//! neutral value 0.5; candidates without a usable id are dropped.

pub mod error;
pub mod normalizer;
pub mod types;


pub use error::NormalizeError;
pub use normalizer::{Normalizer, normalize};
pub use types::{
    CalibrationRanges, DropReason, DroppedCandidate, MetricRange, NormalizationOutcome,
    NormalizedCandidate,
};
