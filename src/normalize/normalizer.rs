use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::constants::{NEUTRAL_METRIC_VALUE, approx_equal};
use crate::profile::RankingConfig;
use crate::retrieval::CandidateDocument;

use super::error::NormalizeError;
use super::types::{
    CalibrationRanges, DropReason, DroppedCandidate, MetricRange, NormalizationOutcome,
    NormalizedCandidate,
};

/// Normalizer bound to a metric set and calibration ranges.
#[derive(Debug, Clone)]
pub struct Normalizer {
    metrics: Vec<String>,
    calibration: CalibrationRanges,
}

impl Normalizer {
    pub fn new(metrics: Vec<String>, calibration: CalibrationRanges) -> Self {
        Self {
            metrics,
            calibration,
        }
    }

    /// Normalizes every metric weighed by any configured profile.
    pub fn from_ranking(config: &RankingConfig) -> Self {
        Self::new(config.profiles.metrics(), config.calibration.clone())
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn calibration(&self) -> &CalibrationRanges {
        &self.calibration
    }

    pub fn normalize(
        &self,
        candidates: Vec<CandidateDocument>,
    ) -> Result<NormalizationOutcome, NormalizeError> {
        normalize(candidates, &self.metrics, &self.calibration)
    }
}

/// Rescales `metrics` of every candidate into `[0, 1]`.
///
/// Empty input is not an error (there were simply no matches). Input whose
/// candidates are all malformed is [`NormalizeError::AllCandidatesDropped`].
pub fn normalize(
    candidates: Vec<CandidateDocument>,
    metrics: &[String],
    calibration: &CalibrationRanges,
) -> Result<NormalizationOutcome, NormalizeError> {
    if candidates.is_empty() {
        return Ok(NormalizationOutcome::default());
    }

    let total = candidates.len();
    let (kept, dropped) = partition_malformed(candidates);

    for d in &dropped {
        warn!(
            retrieval_rank = d.retrieval_rank,
            id = %d.id,
            reason = %d.reason,
            "Dropping malformed candidate"
        );
    }

    if kept.is_empty() {
        return Err(NormalizeError::AllCandidatesDropped { dropped: total });
    }

    let ranges: BTreeMap<String, Option<MetricRange>> = metrics
        .iter()
        .map(|metric| {
            let range = calibration
                .get(metric)
                .copied()
                .or_else(|| batch_range(&kept, metric));
            (metric.clone(), range)
        })
        .collect();

    let candidates = kept
        .into_iter()
        .map(|(retrieval_rank, doc)| {
            let mut values = BTreeMap::new();
            let mut defaulted = Vec::new();

            for (metric, range) in &ranges {
                let value = match (doc.raw(metric), range) {
                    (Some(raw), Some(range)) => scale(raw, range),
                    _ => {
                        defaulted.push(metric.clone());
                        NEUTRAL_METRIC_VALUE
                    }
                };
                values.insert(metric.clone(), value);
            }

            NormalizedCandidate {
                id: doc.id,
                values,
                metadata: doc.metadata,
                retrieval_rank,
                partial_metrics: !defaulted.is_empty(),
                defaulted,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        candidates = candidates.len(),
        dropped = dropped.len(),
        partial = candidates.iter().filter(|c| c.partial_metrics).count(),
        "Batch normalized"
    );

    Ok(NormalizationOutcome {
        candidates,
        dropped,
        ranges,
    })
}

fn partition_malformed(
    candidates: Vec<CandidateDocument>,
) -> (Vec<(usize, CandidateDocument)>, Vec<DroppedCandidate>) {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut kept = Vec::with_capacity(candidates.len());
    let mut dropped = Vec::new();

    for (retrieval_rank, doc) in candidates.into_iter().enumerate() {
        let reason = if doc.id.trim().is_empty() {
            Some(DropReason::MissingId)
        } else if !seen.insert(doc.id.clone()) {
            Some(DropReason::DuplicateId)
        } else {
            None
        };

        match reason {
            Some(reason) => dropped.push(DroppedCandidate {
                retrieval_rank,
                id: doc.id,
                reason,
            }),
            None => kept.push((retrieval_rank, doc)),
        }
    }

    (kept, dropped)
}

fn batch_range(candidates: &[(usize, CandidateDocument)], metric: &str) -> Option<MetricRange> {
    candidates
        .iter()
        .filter_map(|(_, doc)| doc.raw(metric))
        .fold(None, |acc: Option<MetricRange>, v| match acc {
            None => Some(MetricRange::new(v, v)),
            Some(r) => Some(MetricRange::new(r.min.min(v), r.max.max(v))),
        })
}

/// Clamps `raw` into `range` and rescales it; zero-spread ranges yield the neutral value.
fn scale(raw: f64, range: &MetricRange) -> f64 {
    // `!(max > min)` also catches NaN bounds from hand-built calibration tables.
    if !(range.max > range.min) || approx_equal(range.min, range.max) {
        return NEUTRAL_METRIC_VALUE;
    }
    let clamped = raw.clamp(range.min, range.max);
    ((clamped - range.min) / (range.max - range.min)).clamp(0.0, 1.0)
}
