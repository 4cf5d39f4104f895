use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by normalization.
pub enum NormalizeError {
    /// Retrieval returned candidates but every one was malformed.
    #[error("all {dropped} retrieved candidates were malformed and dropped")]
    AllCandidatesDropped {
        /// Number of candidates dropped.
        dropped: usize,
    },
}
