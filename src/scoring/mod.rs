//! Intent-weighted hybrid scoring.
//!
//! Each candidate's hybrid score is `Σ weight × normalized value` over the
//! metrics of the resolved profile. The per-metric contributions are kept in
//! [`RankedCandidate::component_scores`] and reused unchanged by the explainer,
//! so a score and its explanation always agree.

pub mod scorer;
pub mod types;


pub use scorer::{HybridScorer, rank_with_profile};
pub use types::{ComponentScore, ProfileUsage, RankedCandidate, ScoringOutcome};
