use std::collections::BTreeMap;

use super::*;
use crate::retrieval::Metadata;
use crate::scoring::{ComponentScore, RankedCandidate};

fn ranked(id: &str, components: &[(&str, f64, f64)]) -> RankedCandidate {
    let component_scores: BTreeMap<String, ComponentScore> = components
        .iter()
        .map(|(metric, weight, value)| (metric.to_string(), ComponentScore::new(*weight, *value)))
        .collect();
    RankedCandidate {
        id: id.to_string(),
        hybrid_score: component_scores.values().map(|c| c.contribution).sum(),
        component_scores,
        values: BTreeMap::new(),
        rank: 0,
        retrieval_rank: 0,
        partial_metrics: false,
        defaulted: Vec::new(),
        metadata: Metadata::new(),
    }
}

fn accuracy_winner() -> RankedCandidate {
    ranked(
        "A",
        &[
            ("similarity", 0.5, 1.0),
            ("doc_quality", 0.3, 0.0),
            ("recency", 0.1, 1.0),
            ("popularity", 0.1, 0.0),
        ],
    )
}

#[test]
fn test_breakdown_copies_contributions() {
    let top = accuracy_winner();
    let explanation = explain(&top);

    assert_eq!(explanation.chosen_id, "A");
    assert_eq!(explanation.weight_breakdown.len(), 4);
    for entry in &explanation.weight_breakdown {
        let stored = top.component(&entry.metric).unwrap();
        assert_eq!(entry.contribution, stored.contribution);
        assert_eq!(entry.weight, stored.weight);
        assert_eq!(entry.value, stored.normalized_value);
    }
    assert!((explanation.total_contribution() - top.hybrid_score).abs() < 1e-9);
}

#[test]
fn test_breakdown_sorted_by_contribution_then_name() {
    let explanation = explain(&accuracy_winner());
    let metrics: Vec<_> = explanation
        .weight_breakdown
        .iter()
        .map(|e| e.metric.as_str())
        .collect();

    assert_eq!(metrics, vec!["similarity", "recency", "doc_quality", "popularity"]);
}

#[test]
fn test_narrative_names_top_contributors_with_shares() {
    let explanation = explain(&accuracy_winner());

    assert!(explanation.narrative.starts_with("A was ranked first"));
    assert!(explanation.narrative.contains("similarity (83% of the score)"));
    assert!(explanation.narrative.contains("recency (17% of the score)"));
    assert!(!explanation.narrative.contains("popularity"));
}

#[test]
fn test_shares_are_relative_to_hybrid_score() {
    let mut top = ranked("A", &[("similarity", 0.5, 0.5), ("doc_quality", 0.5, 0.5)]);
    top.hybrid_score = 1.0;

    let explanation = explain(&top);
    assert!(explanation.narrative.contains("doc quality (25% of the score)"));
    assert!(explanation.narrative.contains("similarity (25% of the score)"));
}

#[test]
fn test_narrative_uses_metadata_name() {
    let mut top = accuracy_winner();
    top.metadata
        .insert("api_name".to_string(), serde_json::json!("Geo Lookup"));

    let explanation = explain(&top);

    assert!(explanation.narrative.starts_with("Geo Lookup was ranked first"));
    assert_eq!(explanation.chosen_id, "A");
}

#[test]
fn test_zero_contributions_report_insufficient_signal() {
    let top = ranked(
        "flat",
        &[("similarity", 0.6, 0.0), ("doc_quality", 0.4, 0.0)],
    );

    let explanation = explain(&top);

    assert!(explanation.narrative.contains("insufficient signal"));
    assert_eq!(explanation.weight_breakdown.len(), 2);
    assert_eq!(explanation.total_contribution(), 0.0);
}

#[test]
fn test_defaulted_metrics_are_mentioned() {
    let mut top = accuracy_winner();
    top.partial_metrics = true;
    top.defaulted = vec!["doc_quality".to_string()];

    let explanation = explain(&top);

    assert!(explanation
        .narrative
        .contains("No data was available for doc quality"));
}

#[test]
fn test_explanation_serializes_camel_case() {
    let value = serde_json::to_value(explain(&accuracy_winner())).unwrap();

    assert_eq!(value["chosenId"], "A");
    assert!(value["narrative"].is_string());
    assert_eq!(value["weightBreakdown"][0]["metric"], "similarity");
    assert_eq!(value["weightBreakdown"][0]["contribution"], 0.5);
}
