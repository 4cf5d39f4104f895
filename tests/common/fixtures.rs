//! Test fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use apimatch::pipeline::{MemoryRecorder, Pipeline, PipelineSettings};
use apimatch::profile::RankingConfig;
use apimatch::retrieval::{CandidateDocument, MockRetriever};
use serde_json::json;

pub const EPSILON: f64 = 1e-9;

pub const ACCURACY_CONFIG: &str = r#"{
    "default_profile": "default",
    "profiles": {
        "accuracy": {
            "weights": {"similarity": 0.5, "doc_quality": 0.3, "recency": 0.1, "popularity": 0.1},
            "keywords": ["accura", "precise"]
        }
    }
}"#;

pub fn accuracy_ranking() -> RankingConfig {
    RankingConfig::from_json_str(ACCURACY_CONFIG).expect("fixture config is valid")
}

pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        max_in_flight: 8,
        admission_timeout: Duration::ZERO,
        retrieval_timeout: Duration::from_secs(2),
    }
}

pub fn candidate(id: &str, sim: f64, quality: f64, recency: f64, popularity: f64) -> CandidateDocument {
    CandidateDocument::new(id)
        .with_field("similarity", sim)
        .with_field("doc_quality", quality)
        .with_field("recency", recency)
        .with_field("popularity", popularity)
}

/// The two-candidate batch used by the accuracy-profile scenario.
pub fn scenario_candidates() -> Vec<CandidateDocument> {
    vec![
        candidate("A", 0.90, 0.80, 0.50, 0.30).with_metadata("name", json!("Alpha Maps")),
        candidate("B", 0.85, 0.95, 0.40, 0.60).with_metadata("name", json!("Beta Geo")),
    ]
}

/// A larger catalog with categories and raw, un-normalized metric scales.
pub fn catalog() -> Vec<CandidateDocument> {
    vec![
        candidate("openweather", 0.93, 4.1, 1_700_000_000.0, 52_000.0)
            .with_metadata("category", json!("weather")),
        candidate("weatherstack", 0.88, 3.6, 1_650_000_000.0, 8_000.0)
            .with_metadata("category", json!("weather")),
        candidate("mapbox", 0.71, 4.7, 1_710_000_000.0, 91_000.0)
            .with_metadata("category", json!("geo")),
        candidate("twilio", 0.42, 4.9, 1_690_000_000.0, 120_000.0)
            .with_metadata("category", json!("messaging")),
        candidate("tomorrow-io", 0.86, 3.9, 1_705_000_000.0, 3_500.0)
            .with_metadata("category", json!("weather")),
    ]
}

pub struct Harness {
    pub pipeline: Pipeline<MockRetriever>,
    pub retriever: MockRetriever,
    pub recorder: Arc<MemoryRecorder>,
}

pub fn harness(retriever: MockRetriever, ranking: RankingConfig, settings: PipelineSettings) -> Harness {
    let recorder = Arc::new(MemoryRecorder::new());
    let pipeline = Pipeline::new(retriever.clone(), ranking, settings).with_recorder(recorder.clone());
    Harness {
        pipeline,
        retriever,
        recorder,
    }
}
