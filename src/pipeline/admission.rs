use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tracing::debug;

use super::error::PipelineError;

/// Bounds the number of requests processed at once.
///
/// A request over the limit waits up to `queue_timeout` for a slot and is then
/// rejected with [`PipelineError::Overloaded`]; it is never dropped silently.
#[derive(Debug)]
pub struct AdmissionControl {
    permits: Semaphore,
    limit: usize,
    queue_timeout: Duration,
}

/// Held for the lifetime of an admitted request.
#[derive(Debug)]
pub struct AdmissionPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl AdmissionControl {
    pub fn new(limit: usize, queue_timeout: Duration) -> Self {
        Self {
            permits: Semaphore::new(limit),
            limit,
            queue_timeout,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.limit.saturating_sub(self.permits.available_permits())
    }

    pub async fn admit(&self) -> Result<AdmissionPermit<'_>, PipelineError> {
        let overloaded = PipelineError::Overloaded { limit: self.limit };

        match self.permits.try_acquire() {
            Ok(permit) => return Ok(AdmissionPermit { _permit: permit }),
            Err(TryAcquireError::Closed) => return Err(overloaded),
            Err(TryAcquireError::NoPermits) if self.queue_timeout.is_zero() => {
                return Err(overloaded);
            }
            Err(TryAcquireError::NoPermits) => {}
        }

        debug!(
            limit = self.limit,
            wait_ms = self.queue_timeout.as_millis() as u64,
            "Admission limit reached, queueing"
        );

        match tokio::time::timeout(self.queue_timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => Ok(AdmissionPermit { _permit: permit }),
            Ok(Err(_)) | Err(_) => Err(overloaded),
        }
    }
}
