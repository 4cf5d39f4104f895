use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TOP_K;
use crate::retrieval::Filters;

use super::error::PipelineError;

/// One matching request as accepted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Caller-supplied id; generated when absent or blank.
    #[serde(default, alias = "requestId")]
    pub request_id: Option<String>,
    pub query: String,
    /// Free-form intent; empty selects the default profile.
    #[serde(default)]
    pub intent: String,
    #[serde(default = "default_top_k", alias = "topK")]
    pub top_k: usize,
    #[serde(default)]
    pub filters: Filters,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl MatchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            request_id: None,
            query: query.into(),
            intent: String::new(),
            top_k: DEFAULT_TOP_K,
            filters: Filters::new(),
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    /// The caller's id, verbatim, if it is not blank.
    pub fn supplied_id(&self) -> Option<&str> {
        self.request_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.query.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidRequest(
                "top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
