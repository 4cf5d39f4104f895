use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by retrieval backends.
pub enum RetrievalError {
    /// The backend could not be reached or rejected the search.
    #[error("retrieval backend '{backend}' unavailable: {message}")]
    Unreachable {
        /// Backend URL or name.
        backend: String,
        /// Error message.
        message: String,
    },

    /// Retrieval did not finish in time.
    #[error("retrieval timed out after {after_ms} ms")]
    Timeout {
        /// Deadline in milliseconds.
        after_ms: u64,
    },

    /// The query could not be embedded.
    #[error("query embedding failed: {message}")]
    Embedding {
        /// Error message.
        message: String,
    },

    /// The backend answered with something unusable.
    #[error("invalid retrieval response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// A filter value cannot be expressed as a backend condition.
    #[error("invalid filter '{field}': {reason}")]
    InvalidFilter {
        /// Filter field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The backend pool has been shut down.
    #[error("retrieval backend pool is closed")]
    PoolClosed,
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;
