use std::time::Duration;

use serde::Serialize;

use crate::explain::Explanation;
use crate::scoring::{ProfileUsage, RankedCandidate};

use super::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Wall-clock time spent per stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub retrieval_ms: f64,
    pub scoring_ms: f64,
    pub explain_ms: f64,
}

pub(crate) fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Complete response for one request, successful or not.
///
/// Failure envelopes always carry the request id, empty results, a null
/// explanation and an error string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub request_id: String,
    pub status: ResponseStatus,
    pub results: Vec<RankedCandidate>,
    pub explanation: Option<Explanation>,
    pub error: Option<String>,
    pub profile: Option<ProfileUsage>,
    pub dropped_candidates: usize,
    pub timing: StageTiming,
}

impl ResponseEnvelope {
    pub fn success(
        request_id: String,
        results: Vec<RankedCandidate>,
        explanation: Option<Explanation>,
        profile: ProfileUsage,
        dropped_candidates: usize,
        timing: StageTiming,
    ) -> Self {
        Self {
            request_id,
            status: ResponseStatus::Ok,
            results,
            explanation,
            error: None,
            profile: Some(profile),
            dropped_candidates,
            timing,
        }
    }

    pub fn failure(request_id: String, error: &PipelineError) -> Self {
        Self {
            request_id,
            status: ResponseStatus::Error,
            results: Vec::new(),
            explanation: None,
            error: Some(error.to_string()),
            profile: None,
            dropped_candidates: 0,
            timing: StageTiming::default(),
        }
    }

    pub fn with_profile(mut self, profile: Option<ProfileUsage>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_dropped(mut self, dropped_candidates: usize) -> Self {
        self.dropped_candidates = dropped_candidates;
        self
    }

    pub fn with_timing(mut self, timing: StageTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
