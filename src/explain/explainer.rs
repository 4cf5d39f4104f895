use std::fmt::Write as _;

use crate::scoring::RankedCandidate;

use super::types::{BreakdownEntry, Explanation};

/// Contributors named in the narrative at most.
const MAX_NAMED_CONTRIBUTORS: usize = 2;

/// Builds the explanation for `top` from its stored component scores.
///
/// Contributions are copied, never recomputed, so the breakdown always sums to
/// the candidate's hybrid score.
pub fn explain(top: &RankedCandidate) -> Explanation {
    let mut weight_breakdown: Vec<BreakdownEntry> = top
        .component_scores
        .iter()
        .map(|(metric, c)| BreakdownEntry {
            metric: metric.clone(),
            weight: c.weight,
            value: c.normalized_value,
            contribution: c.contribution,
        })
        .collect();

    weight_breakdown.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.metric.cmp(&b.metric))
    });

    let narrative = narrative(top, &weight_breakdown);

    Explanation {
        chosen_id: top.id.clone(),
        narrative,
        weight_breakdown,
    }
}

fn narrative(top: &RankedCandidate, breakdown: &[BreakdownEntry]) -> String {
    let name = top.display_name();
    let total = top.hybrid_score;

    let positive: Vec<&BreakdownEntry> = breakdown
        .iter()
        .filter(|e| e.contribution > 0.0)
        .take(MAX_NAMED_CONTRIBUTORS)
        .collect();

    let mut text = if positive.is_empty() || total <= 0.0 {
        format!("{name} was ranked first, but there is insufficient signal to explain why: no metric contributed to its score.")
    } else {
        let reasons: Vec<String> = positive
            .iter()
            .map(|e| {
                format!(
                    "{} ({}% of the score)",
                    display_metric(&e.metric),
                    share_percent(e.contribution, total)
                )
            })
            .collect();
        format!(
            "{name} was ranked first mainly because of its {}.",
            reasons.join(" and ")
        )
    };

    if !top.defaulted.is_empty() {
        let missing: Vec<String> = top.defaulted.iter().map(|m| display_metric(m)).collect();
        let _ = write!(
            text,
            " No data was available for {}, so a neutral value was used.",
            missing.join(", ")
        );
    }

    text
}

fn display_metric(metric: &str) -> String {
    metric.replace('_', " ")
}

fn share_percent(contribution: f64, total: f64) -> u32 {
    ((contribution / total) * 100.0).round().clamp(0.0, 100.0) as u32
}
