//! End-to-end pipeline behaviour against in-memory retrievers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use apimatch::pipeline::{
    MatchRequest, PanickingRecorder, Pipeline, PipelineEvent, PipelineSettings, PipelineStage,
    ResponseStatus,
};
use apimatch::profile::{IntentResolution, RankingConfig};
use apimatch::retrieval::{
    BackendPool, CandidateDocument, Filters, MockRetriever, RetrievalError, RetrievalResult,
    Retriever,
};
use common::fixtures::{
    EPSILON, accuracy_ranking, candidate, catalog, fast_settings, harness, scenario_candidates,
};
use serde_json::json;

#[tokio::test]
async fn test_accuracy_scenario_fixed_scores() {
    let h = harness(
        MockRetriever::new(scenario_candidates()),
        accuracy_ranking(),
        fast_settings(),
    );

    let envelope = h
        .pipeline
        .run(MatchRequest::new("map tiles").with_intent("accuracy").with_top_k(3))
        .await;

    assert_eq!(envelope.status, ResponseStatus::Ok);
    assert_eq!(envelope.results.len(), 2);

    let a = &envelope.results[0];
    let b = &envelope.results[1];
    assert_eq!((a.id.as_str(), a.rank), ("A", 0));
    assert_eq!((b.id.as_str(), b.rank), ("B", 1));
    assert!((a.hybrid_score - 0.6).abs() < EPSILON);
    assert!((b.hybrid_score - 0.4).abs() < EPSILON);

    let explanation = envelope.explanation.as_ref().unwrap();
    assert_eq!(explanation.chosen_id, "A");
    assert!(explanation.narrative.starts_with("Alpha Maps was ranked first"));
    assert_eq!(explanation.weight_breakdown[0].metric, "similarity");

    let profile = envelope.profile.as_ref().unwrap();
    assert_eq!(profile.applied, "accuracy");
    assert_eq!(profile.resolution, IntentResolution::Exact);
    assert!(!profile.fallback);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let h = harness(MockRetriever::new(catalog()), RankingConfig::builtin(), fast_settings());
    let request = MatchRequest::new("weather forecast")
        .with_intent("latest")
        .with_top_k(5)
        .with_request_id("same");

    let first = h.pipeline.run(request.clone()).await;
    for _ in 0..5 {
        let again = h.pipeline.run(request.clone()).await;
        assert_eq!(again.results, first.results);
        assert_eq!(again.explanation, first.explanation);
    }
}

#[tokio::test]
async fn test_breakdown_sums_to_hybrid_score() {
    let h = harness(MockRetriever::new(catalog()), RankingConfig::builtin(), fast_settings());

    for intent in ["recommend", "latest", "popular", "reliable", "", "astrology"] {
        let envelope = h
            .pipeline
            .run(MatchRequest::new("weather").with_intent(intent))
            .await;
        let top = &envelope.results[0];
        let explanation = envelope.explanation.as_ref().unwrap();

        assert_eq!(explanation.chosen_id, top.id);
        assert!(
            (explanation.total_contribution() - top.hybrid_score).abs() < EPSILON,
            "intent {intent:?}"
        );
    }
}

#[tokio::test]
async fn test_applied_weights_sum_to_one() {
    let ranking = accuracy_ranking();
    for profile in ranking.profiles.profiles() {
        assert!((profile.weight_sum() - 1.0).abs() < EPSILON, "{}", profile.intent());
    }

    let h = harness(MockRetriever::new(catalog()), ranking, fast_settings());
    let envelope = h.pipeline.run(MatchRequest::new("weather").with_intent("popular")).await;
    let used: f64 = envelope.explanation.unwrap().weight_breakdown.iter().map(|e| e.weight).sum();
    assert!((used - 1.0).abs() < EPSILON);
}

#[tokio::test]
async fn test_degenerate_metric_is_neutral_in_results() {
    let candidates = vec![
        candidate("a", 0.9, 3.0, 10.0, 1.0),
        candidate("b", 0.8, 3.0, 20.0, 2.0),
        candidate("c", 0.7, 3.0, 30.0, 3.0),
    ];
    let h = harness(MockRetriever::new(candidates), RankingConfig::builtin(), fast_settings());

    let envelope = h.pipeline.run(MatchRequest::new("anything")).await;
    let value = serde_json::to_value(&envelope).unwrap();

    for result in value["results"].as_array().unwrap() {
        assert_eq!(result["doc_quality"], json!(0.5));
        assert_eq!(result["partial_metrics"], json!(false));
    }
}

#[tokio::test]
async fn test_unknown_intent_uses_default_profile() {
    let h = harness(MockRetriever::new(catalog()), RankingConfig::builtin(), fast_settings());

    let envelope = h
        .pipeline
        .run(MatchRequest::new("weather").with_intent("astrology"))
        .await;

    assert!(envelope.is_ok());
    let profile = envelope.profile.unwrap();
    assert_eq!(profile.applied, "default");
    assert!(profile.fallback);

    let value = serde_json::to_value(&h.pipeline.run(MatchRequest::new("x").with_intent("nope")).await).unwrap();
    assert_eq!(value["profile"]["fallback"], json!(true));
    assert_eq!(value["profile"]["resolution"], json!("fallback"));
}

#[tokio::test]
async fn test_keyword_intent_is_inferred() {
    let h = harness(MockRetriever::new(catalog()), accuracy_ranking(), fast_settings());

    let envelope = h
        .pipeline
        .run(MatchRequest::new("weather").with_intent("most precise please"))
        .await;

    let profile = envelope.profile.unwrap();
    assert_eq!(profile.applied, "accuracy");
    assert_eq!(profile.resolution, IntentResolution::Inferred);
    assert_eq!(profile.matched_keyword.as_deref(), Some("precise"));
}

#[tokio::test]
async fn test_empty_retrieval_is_ok_without_explanation() {
    let h = harness(MockRetriever::empty(), RankingConfig::builtin(), fast_settings());

    let envelope = h.pipeline.run(MatchRequest::new("nothing matches this")).await;
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["status"], json!("ok"));
    assert_eq!(value["results"], json!([]));
    assert!(value["explanation"].is_null());
    assert!(value["error"].is_null());
}

#[tokio::test]
async fn test_retrieval_error_echoes_supplied_id() {
    let h = harness(MockRetriever::unreachable(), RankingConfig::builtin(), fast_settings());

    let envelope = h
        .pipeline
        .run(MatchRequest::new("weather").with_request_id("req-42"))
        .await;

    assert_eq!(envelope.request_id, "req-42");
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert!(envelope.results.is_empty());
    assert!(envelope.explanation.is_none());
    assert!(envelope.error.as_deref().unwrap().contains("connection refused"));

    let failed = h.recorder.for_request("req-42").into_iter().find_map(|e| match e {
        PipelineEvent::RequestFailed { stage, kind, .. } => Some((stage, kind)),
        _ => None,
    });
    assert_eq!(failed, Some((PipelineStage::Retrieving, "retrieval")));
}

#[tokio::test]
async fn test_retrieval_error_generates_id_when_missing() {
    let h = harness(MockRetriever::unreachable(), RankingConfig::builtin(), fast_settings());

    let first = h.pipeline.run(MatchRequest::new("weather")).await;
    let second = h.pipeline.run(MatchRequest::new("weather")).await;

    assert!(!first.is_ok());
    assert!(uuid::Uuid::parse_str(&first.request_id).is_ok());
    assert_ne!(first.request_id, second.request_id);
}

#[tokio::test]
async fn test_all_candidates_malformed_is_error() {
    let h = harness(
        MockRetriever::new(vec![CandidateDocument::new(""), CandidateDocument::new("  ")]),
        RankingConfig::builtin(),
        fast_settings(),
    );

    let envelope = h.pipeline.run(MatchRequest::new("weather").with_request_id("r")).await;

    assert_eq!(envelope.status, ResponseStatus::Error);
    assert!(envelope.results.is_empty());
    assert!(envelope.error.unwrap().contains("malformed"));
}

#[tokio::test]
async fn test_malformed_candidate_dropped_rest_ranked() {
    let mut candidates = catalog();
    candidates.insert(1, CandidateDocument::new("").with_field("similarity", 0.99));
    let h = harness(MockRetriever::new(candidates), RankingConfig::builtin(), fast_settings());

    let envelope = h.pipeline.run(MatchRequest::new("weather")).await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.results.len(), 5);
    assert_eq!(envelope.dropped_candidates, 1);
}

#[tokio::test]
async fn test_filters_reach_retriever() {
    let h = harness(MockRetriever::new(catalog()), RankingConfig::builtin(), fast_settings());

    let envelope = h
        .pipeline
        .run(MatchRequest::new("forecast").with_filter("category", json!("weather")))
        .await;

    assert_eq!(envelope.results.len(), 3);
    assert!(
        envelope
            .results
            .iter()
            .all(|r| r.metadata["category"] == json!("weather"))
    );
}

struct OverflowingRetriever(Vec<CandidateDocument>);

impl Retriever for OverflowingRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _top_k: usize,
        _filters: &Filters,
    ) -> RetrievalResult<Vec<CandidateDocument>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_results_truncated_to_top_k() {
    let pipeline = Pipeline::new(
        OverflowingRetriever(catalog()),
        RankingConfig::builtin(),
        fast_settings(),
    );

    let envelope = pipeline.run(MatchRequest::new("weather").with_top_k(2)).await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.results.len(), 2);
}

#[tokio::test]
async fn test_admission_rejects_excess_requests_with_id() {
    let settings = PipelineSettings {
        max_in_flight: 1,
        admission_timeout: Duration::ZERO,
        retrieval_timeout: Duration::from_secs(2),
    };
    let h = harness(
        MockRetriever::new(catalog()).with_delay(Duration::from_millis(100)),
        RankingConfig::builtin(),
        settings,
    );

    let (first, second) = tokio::join!(
        h.pipeline.run(MatchRequest::new("weather").with_request_id("first")),
        h.pipeline.run(MatchRequest::new("weather").with_request_id("second")),
    );

    assert!(first.is_ok());
    assert_eq!(second.request_id, "second");
    assert_eq!(second.status, ResponseStatus::Error);
    assert!(second.error.unwrap().contains("overloaded"));
    assert_eq!(h.retriever.call_count(), 1);
    assert_eq!(h.pipeline.in_flight(), 0);
}

#[tokio::test]
async fn test_admission_queue_lets_request_through() {
    let settings = PipelineSettings {
        max_in_flight: 1,
        admission_timeout: Duration::from_secs(2),
        retrieval_timeout: Duration::from_secs(2),
    };
    let h = harness(
        MockRetriever::new(catalog()).with_delay(Duration::from_millis(30)),
        RankingConfig::builtin(),
        settings,
    );

    let (first, second) = tokio::join!(
        h.pipeline.run(MatchRequest::new("weather")),
        h.pipeline.run(MatchRequest::new("weather")),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(h.retriever.peak_in_flight(), 1);
}

#[tokio::test]
async fn test_retrieval_timeout_becomes_error_envelope() {
    let settings = PipelineSettings {
        retrieval_timeout: Duration::from_millis(20),
        ..fast_settings()
    };
    let slow = MockRetriever::new(catalog()).with_delay(Duration::from_secs(5));
    let pool = BackendPool::new(vec![slow.clone()]);
    let pipeline = Pipeline::new(pool, RankingConfig::builtin(), settings);

    let envelope = pipeline.run(MatchRequest::new("weather").with_request_id("slow")).await;

    assert_eq!(envelope.request_id, "slow");
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert!(envelope.error.unwrap().contains("timed out"));
    assert_eq!(pipeline.retriever().available(), 1);
    assert_eq!(slow.in_flight(), 0);
}

#[tokio::test]
async fn test_pool_handles_released_after_failures() {
    let pool = BackendPool::new(vec![MockRetriever::unreachable(), MockRetriever::unreachable()]);
    let pipeline = Pipeline::new(pool, RankingConfig::builtin(), fast_settings());

    for _ in 0..5 {
        let envelope = pipeline.run(MatchRequest::new("weather")).await;
        assert!(!envelope.is_ok());
    }

    assert_eq!(pipeline.retriever().available(), 2);
    assert_eq!(pipeline.in_flight(), 0);
}

#[tokio::test]
async fn test_stage_panic_is_contained() {
    let pool = BackendPool::new(vec![MockRetriever::new(catalog()).panicking("index corrupted")]);
    let pipeline = Pipeline::new(pool, RankingConfig::builtin(), fast_settings());

    let envelope = pipeline.run(MatchRequest::new("weather").with_request_id("boom")).await;

    assert_eq!(envelope.request_id, "boom");
    assert_eq!(envelope.status, ResponseStatus::Error);
    assert!(envelope.results.is_empty());
    let error = envelope.error.unwrap();
    assert!(error.contains("internal error"));
    assert!(error.contains("index corrupted"));
    assert_eq!(pipeline.retriever().available(), 1);
    assert_eq!(pipeline.in_flight(), 0);
}

#[tokio::test]
async fn test_panicking_recorder_never_breaks_requests() {
    let pipeline = Pipeline::new(
        MockRetriever::new(catalog()),
        RankingConfig::builtin(),
        fast_settings(),
    )
    .with_recorder(Arc::new(PanickingRecorder));

    let envelope = pipeline.run(MatchRequest::new("weather")).await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.results.len(), 5);
}

#[tokio::test]
async fn test_concurrent_requests_do_not_interfere() {
    let pipeline = Arc::new(Pipeline::new(
        BackendPool::new(vec![MockRetriever::new(catalog()), MockRetriever::new(catalog())]),
        RankingConfig::builtin(),
        fast_settings(),
    ));

    let mut tasks = Vec::new();
    for (i, intent) in ["latest", "popular", "reliable", "recommend"].into_iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        tasks.push(tokio::spawn(async move {
            let request = MatchRequest::new("weather")
                .with_intent(intent)
                .with_request_id(format!("req-{i}"));
            (intent, pipeline.run(request).await)
        }));
    }

    for task in tasks {
        let (intent, envelope) = task.await.unwrap();
        assert!(envelope.is_ok());
        assert_eq!(envelope.profile.unwrap().applied, intent);
    }
}

#[tokio::test]
async fn test_envelope_json_shape() {
    let h = harness(
        MockRetriever::new(scenario_candidates()),
        accuracy_ranking(),
        fast_settings(),
    );

    let envelope = h
        .pipeline
        .run(MatchRequest::new("maps").with_intent("accuracy").with_request_id("shape"))
        .await;
    let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

    assert_eq!(value["requestId"], json!("shape"));
    assert_eq!(value["status"], json!("ok"));
    let first = &value["results"][0];
    for key in [
        "id",
        "similarity",
        "doc_quality",
        "recency",
        "popularity",
        "hybrid_score",
        "rank",
        "partial_metrics",
        "metadata",
    ] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["explanation"]["chosenId"], json!("A"));
    assert!(value["explanation"]["weightBreakdown"].is_array());
    assert_eq!(value["droppedCandidates"], json!(0));
    assert!(value["timing"]["scoringMs"].is_number());
}

const EXTRA_PROFILES_CONFIG: &str = r#"{
    "default_profile": "default",
    "profiles": {
        "fast": {"weights": {"latency": 1.0}},
        "fresh": {"weights": {"recency": 1.0}}
    }
}"#;

#[tokio::test]
async fn test_unweighed_extra_metric_not_reported_as_defaulted() {
    let h = harness(
        MockRetriever::new(scenario_candidates()),
        RankingConfig::from_json_str(EXTRA_PROFILES_CONFIG).unwrap(),
        fast_settings(),
    );

    let envelope = h.pipeline.run(MatchRequest::new("maps").with_intent("recommend")).await;
    assert!(envelope.is_ok());
    for result in &envelope.results {
        assert!(!result.partial_metrics, "{}", result.id);
        assert!(result.defaulted.is_empty(), "{}", result.id);
    }
    let explanation = envelope.explanation.unwrap();
    assert!(!explanation.narrative.contains("latency"));
    assert!(!explanation.narrative.contains("neutral value"));

    let envelope = h.pipeline.run(MatchRequest::new("maps").with_intent("fast")).await;
    assert!(envelope.results.iter().all(|r| r.partial_metrics));
    assert!(envelope.explanation.unwrap().narrative.contains("No data was available for latency"));
}

#[tokio::test]
async fn test_subset_profile_keeps_result_shape() {
    let h = harness(
        MockRetriever::new(scenario_candidates()),
        RankingConfig::from_json_str(EXTRA_PROFILES_CONFIG).unwrap(),
        fast_settings(),
    );

    let envelope = h.pipeline.run(MatchRequest::new("maps").with_intent("fresh")).await;
    let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

    assert_eq!(value["profile"]["applied"], json!("fresh"));
    assert_eq!(value["profile"]["weights"], json!({"recency": 1.0}));
    for result in value["results"].as_array().unwrap() {
        for key in ["similarity", "doc_quality", "recency", "popularity", "hybrid_score"] {
            assert!(result.get(key).is_some(), "missing {key} in {result}");
        }
    }
    assert_eq!(value["results"][0]["id"], json!("A"));
    assert_eq!(value["results"][0]["similarity"], json!(1.0));
    assert_eq!(value["results"][1]["similarity"], json!(0.0));
}

#[tokio::test]
async fn test_timeout_error_kind_is_recorded() {
    let settings = PipelineSettings {
        retrieval_timeout: Duration::from_millis(10),
        ..fast_settings()
    };
    let h = harness(
        MockRetriever::new(catalog()).with_delay(Duration::from_secs(1)),
        RankingConfig::builtin(),
        settings,
    );

    h.pipeline.run(MatchRequest::new("weather").with_request_id("t")).await;

    let kinds: Vec<_> = h
        .recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::RequestFailed { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["retrieval_timeout"]);
}

#[test]
fn test_timeout_error_message() {
    let err = RetrievalError::Timeout { after_ms: 20 };
    assert_eq!(err.to_string(), "retrieval timed out after 20 ms");
}
