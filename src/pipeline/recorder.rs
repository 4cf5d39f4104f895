//! Fire-and-forget pipeline event sink.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::normalize::DroppedCandidate;

use super::stage::PipelineStage;

/// Something worth recording about a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RequestReceived {
        request_id: String,
        query: String,
        intent: String,
        top_k: usize,
    },
    StageEntered {
        request_id: String,
        stage: PipelineStage,
    },
    CandidatesDropped {
        request_id: String,
        dropped: Vec<DroppedCandidate>,
    },
    IntentFallback {
        request_id: String,
        requested: String,
        applied: String,
    },
    RequestCompleted {
        request_id: String,
        results: usize,
        top_id: Option<String>,
        elapsed_ms: f64,
    },
    RequestFailed {
        request_id: String,
        stage: PipelineStage,
        kind: &'static str,
        error: String,
    },
}

impl PipelineEvent {
    pub fn request_id(&self) -> &str {
        match self {
            PipelineEvent::RequestReceived { request_id, .. }
            | PipelineEvent::StageEntered { request_id, .. }
            | PipelineEvent::CandidatesDropped { request_id, .. }
            | PipelineEvent::IntentFallback { request_id, .. }
            | PipelineEvent::RequestCompleted { request_id, .. }
            | PipelineEvent::RequestFailed { request_id, .. } => request_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::RequestReceived { .. } => "request_received",
            PipelineEvent::StageEntered { .. } => "stage_entered",
            PipelineEvent::CandidatesDropped { .. } => "candidates_dropped",
            PipelineEvent::IntentFallback { .. } => "intent_fallback",
            PipelineEvent::RequestCompleted { .. } => "request_completed",
            PipelineEvent::RequestFailed { .. } => "request_failed",
        }
    }
}

/// Receives pipeline events.
///
/// Called synchronously on the request path; implementations must return
/// quickly and hand slow work off elsewhere.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Renders events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl EventRecorder for TracingRecorder {
    fn record(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::RequestReceived {
                request_id,
                query,
                intent,
                top_k,
            } => info!(%request_id, %query, %intent, top_k, "Request received"),
            PipelineEvent::StageEntered { request_id, stage } => {
                debug!(%request_id, %stage, "Stage entered")
            }
            PipelineEvent::CandidatesDropped {
                request_id,
                dropped,
            } => warn!(%request_id, dropped = dropped.len(), "Malformed candidates dropped"),
            PipelineEvent::IntentFallback {
                request_id,
                requested,
                applied,
            } => info!(%request_id, %requested, %applied, "Intent fell back to default profile"),
            PipelineEvent::RequestCompleted {
                request_id,
                results,
                top_id,
                elapsed_ms,
            } => info!(
                %request_id,
                results,
                top_id = top_id.as_deref().unwrap_or("-"),
                elapsed_ms,
                "Request completed"
            ),
            PipelineEvent::RequestFailed {
                request_id,
                stage,
                kind,
                error,
            } => warn!(%request_id, %stage, kind, %error, "Request failed"),
        }
    }
}

/// Records `event`, swallowing any panic raised by the recorder.
pub(crate) fn record_safely(recorder: &dyn EventRecorder, event: PipelineEvent) {
    let name = event.name();
    if catch_unwind(AssertUnwindSafe(|| recorder.record(event))).is_err() {
        warn!(event = name, "Event recorder panicked; event discarded");
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::{MemoryRecorder, PanickingRecorder};

#[cfg(any(test, feature = "mock"))]
mod mock {
    use parking_lot::Mutex;

    use super::{EventRecorder, PipelineEvent};

    /// Keeps every event in memory.
    #[derive(Debug, Default)]
    pub struct MemoryRecorder {
        events: Mutex<Vec<PipelineEvent>>,
    }

    impl MemoryRecorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<PipelineEvent> {
            self.events.lock().clone()
        }

        pub fn names(&self) -> Vec<&'static str> {
            self.events.lock().iter().map(PipelineEvent::name).collect()
        }

        pub fn for_request(&self, request_id: &str) -> Vec<PipelineEvent> {
            self.events
                .lock()
                .iter()
                .filter(|e| e.request_id() == request_id)
                .cloned()
                .collect()
        }
    }

    impl EventRecorder for MemoryRecorder {
        fn record(&self, event: PipelineEvent) {
            self.events.lock().push(event);
        }
    }

    /// Panics on every event.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PanickingRecorder;

    impl EventRecorder for PanickingRecorder {
        fn record(&self, event: PipelineEvent) {
            panic!("recorder failure on {}", event.name());
        }
    }
}
