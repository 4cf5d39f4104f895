use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::{Span, debug, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::constants::{
    DEFAULT_ADMISSION_TIMEOUT_MS, DEFAULT_MAX_IN_FLIGHT, DEFAULT_RETRIEVAL_TIMEOUT_MS,
};
use crate::explain::explain;
use crate::normalize::Normalizer;
use crate::profile::{ProfileTable, RankingConfig};
use crate::retrieval::{RetrievalError, Retriever};
use crate::scoring::{HybridScorer, ProfileUsage};

use super::admission::AdmissionControl;
use super::envelope::{ResponseEnvelope, StageTiming, millis};
use super::error::PipelineError;
use super::recorder::{EventRecorder, PipelineEvent, TracingRecorder, record_safely};
use super::request::MatchRequest;
use super::stage::{PipelineStage, StageTrace};

/// Runtime limits for a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_in_flight: usize,
    /// Zero rejects over-limit requests without queueing.
    pub admission_timeout: Duration,
    pub retrieval_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            admission_timeout: Duration::from_millis(DEFAULT_ADMISSION_TIMEOUT_MS),
            retrieval_timeout: Duration::from_millis(DEFAULT_RETRIEVAL_TIMEOUT_MS),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_in_flight: config.max_in_flight,
            admission_timeout: config.admission_timeout,
            retrieval_timeout: config.retrieval_timeout,
        }
    }
}

/// Per-request state. Never shared between requests.
#[derive(Debug)]
struct RequestContext {
    request_id: String,
    trace: StageTrace,
    timing: StageTiming,
    dropped: usize,
    profile: Option<ProfileUsage>,
    started: Instant,
}

/// Request orchestrator: retrieval, normalization, scoring, explanation and
/// envelope assembly, in that order.
///
/// The only state shared across concurrent calls to [`Pipeline::run`] is the
/// read-only profile table, the retriever (usually a [`crate::retrieval::BackendPool`])
/// and the admission semaphore.
pub struct Pipeline<R> {
    retriever: R,
    normalizer: Normalizer,
    scorer: HybridScorer,
    admission: AdmissionControl,
    retrieval_timeout: Duration,
    recorder: Arc<dyn EventRecorder>,
}

impl<R> std::fmt::Debug for Pipeline<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("profiles", &self.scorer.profiles().len())
            .field("metrics", &self.normalizer.metrics())
            .field("admission", &self.admission)
            .field("retrieval_timeout", &self.retrieval_timeout)
            .finish()
    }
}

impl<R: Retriever> Pipeline<R> {
    pub fn new(retriever: R, ranking: RankingConfig, settings: PipelineSettings) -> Self {
        let normalizer = Normalizer::from_ranking(&ranking);
        let scorer = HybridScorer::new(Arc::new(ranking.profiles));

        Self {
            retriever,
            normalizer,
            scorer,
            admission: AdmissionControl::new(settings.max_in_flight, settings.admission_timeout),
            retrieval_timeout: settings.retrieval_timeout,
            recorder: Arc::new(TracingRecorder),
        }
    }

    /// Replaces the default [`TracingRecorder`].
    pub fn with_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn profiles(&self) -> &ProfileTable {
        self.scorer.profiles()
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Requests currently admitted.
    pub fn in_flight(&self) -> usize {
        self.admission.in_flight()
    }

    /// Runs one request to completion. Never fails and never panics: every
    /// failure, including a panic inside a stage, becomes an error envelope
    /// carrying the request id.
    #[instrument(skip_all, fields(request_id = tracing::field::Empty))]
    pub async fn run(&self, request: MatchRequest) -> ResponseEnvelope {
        let request_id = request
            .supplied_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Span::current().record("request_id", request_id.as_str());

        let mut ctx = RequestContext {
            request_id,
            trace: StageTrace::new(),
            timing: StageTiming::default(),
            dropped: 0,
            profile: None,
            started: Instant::now(),
        };

        self.record(PipelineEvent::RequestReceived {
            request_id: ctx.request_id.clone(),
            query: request.query.clone(),
            intent: request.intent.clone(),
            top_k: request.top_k,
        });
        self.record(PipelineEvent::StageEntered {
            request_id: ctx.request_id.clone(),
            stage: PipelineStage::Received,
        });

        let outcome = AssertUnwindSafe(self.execute(&request, &mut ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(err)) => self.fail(ctx, err),
            Err(panic) => self.fail(ctx, PipelineError::Internal(panic_message(panic))),
        }
    }

    async fn execute(
        &self,
        request: &MatchRequest,
        ctx: &mut RequestContext,
    ) -> Result<ResponseEnvelope, PipelineError> {
        request.validate()?;
        let _admitted = self.admission.admit().await?;

        self.enter(ctx, PipelineStage::Retrieving)?;
        let started = Instant::now();
        let mut candidates = match tokio::time::timeout(
            self.retrieval_timeout,
            self.retriever
                .retrieve(&request.query, request.top_k, &request.filters),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(RetrievalError::Timeout {
                    after_ms: self.retrieval_timeout.as_millis() as u64,
                }
                .into());
            }
        };
        if candidates.len() > request.top_k {
            warn!(
                returned = candidates.len(),
                top_k = request.top_k,
                "Retriever exceeded top_k, truncating"
            );
            candidates.truncate(request.top_k);
        }
        ctx.timing.retrieval_ms = millis(started.elapsed());

        self.enter(ctx, PipelineStage::Scoring)?;
        let started = Instant::now();
        let normalized = self.normalizer.normalize(candidates)?;
        ctx.dropped = normalized.dropped.len();
        if !normalized.dropped.is_empty() {
            self.record(PipelineEvent::CandidatesDropped {
                request_id: ctx.request_id.clone(),
                dropped: normalized.dropped,
            });
        }
        let scored = self.scorer.score(normalized.candidates, &request.intent);
        if scored.profile.fallback {
            self.record(PipelineEvent::IntentFallback {
                request_id: ctx.request_id.clone(),
                requested: scored.profile.requested.clone(),
                applied: scored.profile.applied.clone(),
            });
        }
        ctx.profile = Some(scored.profile.clone());
        ctx.timing.scoring_ms = millis(started.elapsed());

        self.enter(ctx, PipelineStage::Explaining)?;
        let started = Instant::now();
        let explanation = scored.top().map(explain);
        ctx.timing.explain_ms = millis(started.elapsed());

        self.enter(ctx, PipelineStage::Assembling)?;
        let top_id = scored.top().map(|c| c.id.clone());
        let results = scored.ranked.len();
        let envelope = ResponseEnvelope::success(
            ctx.request_id.clone(),
            scored.ranked,
            explanation,
            scored.profile,
            ctx.dropped,
            ctx.timing,
        );

        self.enter(ctx, PipelineStage::Done)?;
        self.record(PipelineEvent::RequestCompleted {
            request_id: ctx.request_id.clone(),
            results,
            top_id,
            elapsed_ms: millis(ctx.started.elapsed()),
        });

        Ok(envelope)
    }

    fn enter(&self, ctx: &mut RequestContext, stage: PipelineStage) -> Result<(), PipelineError> {
        ctx.trace.advance(stage)?;
        debug!(%stage, "Entering stage");
        self.record(PipelineEvent::StageEntered {
            request_id: ctx.request_id.clone(),
            stage,
        });
        Ok(())
    }

    fn fail(&self, mut ctx: RequestContext, err: PipelineError) -> ResponseEnvelope {
        let stage = ctx.trace.fail();
        warn!(%stage, kind = err.kind(), error = %err, "Request failed");

        self.record(PipelineEvent::StageEntered {
            request_id: ctx.request_id.clone(),
            stage: PipelineStage::Failed,
        });
        self.record(PipelineEvent::RequestFailed {
            request_id: ctx.request_id.clone(),
            stage,
            kind: err.kind(),
            error: err.to_string(),
        });

        ResponseEnvelope::failure(ctx.request_id, &err)
            .with_profile(ctx.profile)
            .with_dropped(ctx.dropped)
            .with_timing(ctx.timing)
    }

    fn record(&self, event: PipelineEvent) {
        record_safely(self.recorder.as_ref(), event);
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("stage panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("stage panicked: {s}")
    } else {
        "stage panicked".to_string()
    }
}
