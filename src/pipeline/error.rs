use thiserror::Error;

use crate::normalize::NormalizeError;
use crate::retrieval::RetrievalError;

use super::stage::PipelineStage;

#[derive(Debug, Error)]
/// Everything that can turn a request into an error envelope.
pub enum PipelineError {
    /// The request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The admission limit was reached and no slot freed up in time.
    #[error("service overloaded: {limit} requests already in flight")]
    Overloaded {
        /// Configured in-flight limit.
        limit: usize,
    },

    /// Retrieval failed or timed out.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// No usable candidate survived normalization.
    #[error("normalization failed: {0}")]
    Normalization(#[from] NormalizeError),

    /// A stage transition skipped or reordered a step.
    #[error("invalid stage transition from {from} to {to}")]
    StageOrder {
        from: PipelineStage,
        to: PipelineStage,
    },

    /// A stage panicked or hit an unexpected fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Short machine-readable kind, used in events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::Overloaded { .. } => "overloaded",
            PipelineError::Retrieval(RetrievalError::Timeout { .. }) => "retrieval_timeout",
            PipelineError::Retrieval(_) => "retrieval",
            PipelineError::Normalization(_) => "all_candidates_dropped",
            PipelineError::StageOrder { .. } => "stage_order",
            PipelineError::Internal(_) => "internal",
        }
    }
}
