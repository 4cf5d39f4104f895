use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::retrieval::{CandidateDocument, Filters, RetrievalError, RetrievalResult, Retriever};

type FailureFn = dyn Fn() -> RetrievalError + Send + Sync;

/// In-memory retriever returning a fixed candidate list.
///
/// Applies filters by metadata equality and truncates to `top_k`. Can be told
/// to fail, to sleep before answering, or to panic.
#[derive(Clone, Default)]
pub struct MockRetriever {
    candidates: Vec<CandidateDocument>,
    failure: Option<Arc<FailureFn>>,
    delay: Option<Duration>,
    panic_message: Option<String>,
    stats: Arc<MockStats>,
}

#[derive(Default)]
struct MockStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a MockStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a MockStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockRetriever {
    pub fn new(candidates: Vec<CandidateDocument>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Fails every call with the error built by `failure`.
    pub fn failing<F>(failure: F) -> Self
    where
        F: Fn() -> RetrievalError + Send + Sync + 'static,
    {
        Self {
            failure: Some(Arc::new(failure)),
            ..Default::default()
        }
    }

    /// Fails every call as an unreachable backend.
    pub fn unreachable() -> Self {
        Self::failing(|| RetrievalError::Unreachable {
            backend: "mock".to_string(),
            message: "connection refused".to_string(),
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.panic_message = Some(message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.stats.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.stats.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Retriever for MockRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        top_k: usize,
        filters: &Filters,
    ) -> RetrievalResult<Vec<CandidateDocument>> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.stats);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.panic_message {
            panic!("{message}");
        }

        if let Some(failure) = &self.failure {
            return Err(failure());
        }

        Ok(self
            .candidates
            .iter()
            .filter(|c| c.matches_filters(filters))
            .take(top_k)
            .cloned()
            .collect())
    }
}
