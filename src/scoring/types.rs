use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::constants::{NEUTRAL_METRIC_VALUE, STANDARD_METRICS};
use crate::profile::{IntentResolution, ResolvedProfile};
use crate::retrieval::Metadata;

/// One metric's share of a hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    pub weight: f64,
    pub normalized_value: f64,
    /// `weight * normalized_value`, computed once by the scorer.
    pub contribution: f64,
}

impl ComponentScore {
    pub fn new(weight: f64, normalized_value: f64) -> Self {
        Self {
            weight,
            normalized_value,
            contribution: weight * normalized_value,
        }
    }
}

/// A scored candidate in final ranking order.
///
/// `component_scores` is the single source of truth for the score: `hybrid_score`
/// is the sum of its contributions and the explainer reads it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub id: String,
    pub hybrid_score: f64,
    pub component_scores: BTreeMap<String, ComponentScore>,
    /// Every normalized metric of the candidate, weighed or not.
    pub values: BTreeMap<String, f64>,
    /// Final position (0-based).
    pub rank: usize,
    /// Position in the retriever's output (0-based).
    pub retrieval_rank: usize,
    /// `true` if a metric the applied profile weighs was missing.
    pub partial_metrics: bool,
    /// Weighed metrics that received the neutral default.
    pub defaulted: Vec<String>,
    pub metadata: Metadata,
}

impl RankedCandidate {
    pub fn component(&self, metric: &str) -> Option<&ComponentScore> {
        self.component_scores.get(metric)
    }

    /// Display name: metadata `name`, then `api_name`, then the id.
    pub fn display_name(&self) -> &str {
        ["name", "api_name"]
            .iter()
            .find_map(|key| {
                self.metadata
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .filter(|name| !name.trim().is_empty())
            })
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Serialize)]
struct ResultRecord<'a> {
    id: &'a str,
    #[serde(flatten)]
    metrics: BTreeMap<&'a str, f64>,
    hybrid_score: f64,
    rank: usize,
    partial_metrics: bool,
    metadata: &'a Metadata,
}

/// Serialized as `{id, <metric>: normalized value..., hybrid_score, rank, partial_metrics, metadata}`.
///
/// The standard metrics are always present, neutral when never normalized.
impl Serialize for RankedCandidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut metrics: BTreeMap<&str, f64> = STANDARD_METRICS
            .iter()
            .map(|metric| (*metric, NEUTRAL_METRIC_VALUE))
            .collect();
        metrics.extend(self.values.iter().map(|(m, v)| (m.as_str(), *v)));
        metrics.extend(
            self.component_scores
                .iter()
                .map(|(m, c)| (m.as_str(), c.normalized_value)),
        );

        ResultRecord {
            id: &self.id,
            metrics,
            hybrid_score: self.hybrid_score,
            rank: self.rank,
            partial_metrics: self.partial_metrics,
            metadata: &self.metadata,
        }
        .serialize(serializer)
    }
}

/// Which profile scored a request and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUsage {
    pub requested: String,
    pub applied: String,
    pub resolution: IntentResolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
    /// `true` when the requested intent was unknown and the default profile was used.
    pub fallback: bool,
    /// Weights of the applied profile.
    pub weights: BTreeMap<String, f64>,
}

impl ProfileUsage {
    pub fn new(requested: &str, resolved: &ResolvedProfile<'_>) -> Self {
        Self {
            requested: requested.to_string(),
            applied: resolved.profile.intent().to_string(),
            resolution: resolved.resolution,
            matched_keyword: resolved.matched_keyword.map(str::to_string),
            fallback: resolved.resolution.is_fallback(),
            weights: resolved.profile.weights().clone(),
        }
    }
}

/// Ranked candidates plus the profile that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub ranked: Vec<RankedCandidate>,
    pub profile: ProfileUsage,
}

impl ScoringOutcome {
    pub fn top(&self) -> Option<&RankedCandidate> {
        self.ranked.first()
    }
}
