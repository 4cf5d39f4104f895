//! Apimatch library crate (used by the CLI binary and integration tests).
//!
//! Matches a natural-language task description to the best-fitting API in a
//! catalog: vector retrieval, per-batch metric normalization, intent-weighted
//! hybrid scoring and an explanation that reuses the exact score contributions.
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`Pipeline`], [`PipelineSettings`], [`MatchRequest`], [`ResponseEnvelope`]
//! - [`EventRecorder`], [`PipelineEvent`], [`TracingRecorder`]
//!
//! ## Stages
//! - [`Retriever`], [`QdrantRetriever`], [`BackendPool`], [`HttpEmbedder`]
//! - [`Normalizer`], [`normalize`]
//! - [`HybridScorer`], [`RankedCandidate`]
//! - [`explain`], [`Explanation`]
//!
//! ## Configuration
//! - [`Config`] (`APIMATCH_*` environment variables)
//! - [`RankingConfig`], [`ProfileTable`], [`IntentWeightProfile`]
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod explain;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod retrieval;
pub mod scoring;

pub use config::{Config, ConfigError};
pub use explain::{BreakdownEntry, Explanation, explain};
pub use normalize::{
    CalibrationRanges, DropReason, DroppedCandidate, MetricRange, NormalizationOutcome,
    NormalizeError, NormalizedCandidate, Normalizer, normalize,
};
pub use pipeline::{
    AdmissionControl, EventRecorder, MatchRequest, Pipeline, PipelineError, PipelineEvent,
    PipelineSettings, PipelineStage, ResponseEnvelope, ResponseStatus, StageTiming, StageTrace,
    TracingRecorder,
};
#[cfg(any(test, feature = "mock"))]
pub use pipeline::{MemoryRecorder, PanickingRecorder};
pub use profile::{
    IntentResolution, IntentWeightProfile, ProfileError, ProfileResult, ProfileTable,
    RankingConfig, ResolvedProfile,
};
#[cfg(any(test, feature = "mock"))]
pub use retrieval::MockRetriever;
pub use retrieval::{
    BackendPool, CandidateDocument, Filters, HttpEmbedder, Metadata, QdrantRetriever,
    QueryEmbedder, RetrievalError, RetrievalResult, Retriever,
};
pub use scoring::{ComponentScore, HybridScorer, ProfileUsage, RankedCandidate, ScoringOutcome};
