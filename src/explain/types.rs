use serde::Serialize;

/// One row of an explanation's weight breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub metric: String,
    pub weight: f64,
    pub value: f64,
    pub contribution: f64,
}

/// Why the top result won.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub chosen_id: String,
    pub narrative: String,
    /// Sorted by contribution, largest first; ties by metric name.
    pub weight_breakdown: Vec<BreakdownEntry>,
}

impl Explanation {
    pub fn total_contribution(&self) -> f64 {
        self.weight_breakdown.iter().map(|e| e.contribution).sum()
    }
}
