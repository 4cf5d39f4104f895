use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::constants::NEUTRAL_METRIC_VALUE;
use crate::normalize::NormalizedCandidate;
use crate::profile::{IntentWeightProfile, ProfileTable};

use super::types::{ComponentScore, ProfileUsage, RankedCandidate, ScoringOutcome};

/// Intent-weighted hybrid scorer over a shared, read-only profile table.
#[derive(Debug, Clone)]
pub struct HybridScorer {
    profiles: Arc<ProfileTable>,
}

impl HybridScorer {
    pub fn new(profiles: Arc<ProfileTable>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Scores and ranks `candidates` under the profile resolved from `intent`.
    ///
    /// An unknown intent is not an error: the default profile applies and the
    /// outcome's [`ProfileUsage::fallback`] is set.
    pub fn score(&self, candidates: Vec<NormalizedCandidate>, intent: &str) -> ScoringOutcome {
        let resolved = self.profiles.resolve(intent);
        let usage = ProfileUsage::new(intent, &resolved);

        if usage.fallback {
            info!(
                requested = intent,
                applied = %usage.applied,
                "Unknown intent, using default profile"
            );
        }

        let ranked = rank_with_profile(candidates, resolved.profile);

        debug!(
            profile = %usage.applied,
            resolution = usage.resolution.as_str(),
            ranked = ranked.len(),
            top_score = ranked.first().map(|c| c.hybrid_score),
            "Candidates scored"
        );

        ScoringOutcome {
            ranked,
            profile: usage,
        }
    }
}

/// Computes every candidate's hybrid score under `profile` and sorts them.
///
/// Order is hybrid score descending, then retrieval rank ascending, so equal
/// scores resolve the same way regardless of sort stability.
pub fn rank_with_profile(
    candidates: Vec<NormalizedCandidate>,
    profile: &IntentWeightProfile,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| score_candidate(candidate, profile))
        .collect();

    ranked.sort_by(|a, b| {
        b.hybrid_score
            .total_cmp(&a.hybrid_score)
            .then_with(|| a.retrieval_rank.cmp(&b.retrieval_rank))
    });

    for (rank, candidate) in ranked.iter_mut().enumerate() {
        candidate.rank = rank;
    }

    ranked
}

fn score_candidate(candidate: NormalizedCandidate, profile: &IntentWeightProfile) -> RankedCandidate {
    let NormalizedCandidate {
        id,
        values,
        metadata,
        retrieval_rank,
        defaulted: normalizer_defaulted,
        ..
    } = candidate;

    // Only metrics this profile weighs can be reported as defaulted.
    let mut defaulted: Vec<String> = normalizer_defaulted
        .into_iter()
        .filter(|metric| profile.weight(metric).is_some())
        .collect();

    let mut component_scores = BTreeMap::new();
    for (metric, &weight) in profile.weights() {
        let value = match values.get(metric) {
            Some(&v) => v,
            None => {
                if !defaulted.contains(metric) {
                    defaulted.push(metric.clone());
                }
                NEUTRAL_METRIC_VALUE
            }
        };
        component_scores.insert(metric.clone(), ComponentScore::new(weight, value));
    }

    let hybrid_score = component_scores.values().map(|c| c.contribution).sum();

    RankedCandidate {
        id,
        hybrid_score,
        component_scores,
        values,
        rank: 0,
        retrieval_rank,
        partial_metrics: !defaulted.is_empty(),
        defaulted,
        metadata,
    }
}
