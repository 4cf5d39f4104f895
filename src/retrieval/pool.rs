use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use super::client::Retriever;
use super::error::{RetrievalError, RetrievalResult};
use super::model::{CandidateDocument, Filters};

/// Fixed set of retrieval handles shared by concurrent requests.
///
/// Each retrieval checks one handle out and gives it back when the checkout
/// guard drops, whether the call succeeded, failed, was cancelled by a timeout
/// or unwound from a panic.
pub struct BackendPool<R> {
    handles: Mutex<Vec<R>>,
    permits: Semaphore,
    size: usize,
}

impl<R> std::fmt::Debug for BackendPool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendPool")
            .field("size", &self.size)
            .field("available", &self.available())
            .finish()
    }
}

struct Checkout<'a, R> {
    handles: &'a Mutex<Vec<R>>,
    handle: Option<R>,
    _permit: SemaphorePermit<'a>,
}

impl<R> Drop for Checkout<'_, R> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.handles.lock().push(handle);
        }
    }
}

impl<R> BackendPool<R> {
    /// Builds a pool over `handles`. An empty pool is closed from the start.
    pub fn new(handles: Vec<R>) -> Self {
        let size = handles.len();
        let permits = Semaphore::new(size);
        if size == 0 {
            permits.close();
        }
        Self {
            handles: Mutex::new(handles),
            permits,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Handles not currently checked out.
    pub fn available(&self) -> usize {
        self.handles.lock().len()
    }

    /// Rejects all further checkouts; in-flight ones complete normally.
    pub fn close(&self) {
        self.permits.close();
    }

    async fn checkout(&self) -> RetrievalResult<Checkout<'_, R>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RetrievalError::PoolClosed)?;

        let handle = self.handles.lock().pop().ok_or(RetrievalError::PoolClosed)?;

        Ok(Checkout {
            handles: &self.handles,
            handle: Some(handle),
            _permit: permit,
        })
    }
}

impl<R: Retriever> Retriever for BackendPool<R> {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &Filters,
    ) -> RetrievalResult<Vec<CandidateDocument>> {
        let checkout = self.checkout().await?;
        debug!(available = self.available(), "Retrieval handle checked out");

        match checkout.handle.as_ref() {
            Some(handle) => handle.retrieve(query, top_k, filters).await,
            None => Err(RetrievalError::PoolClosed),
        }
    }
}
