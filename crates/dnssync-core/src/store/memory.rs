// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Holds change requests in a Vec protected by a RwLock. Useful for tests,
// for embedding the reconciler behind another queue, and for feeding a
// fixed batch of requests through a single pass.
//
// ## Crash Behavior
//
// All state is lost on restart. Requests marked processed in memory are
// pending again in a fresh store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::record::RequestId;
use crate::traits::record_store::{ChangeRequest, RecordStore};

/// In-memory record store implementation
///
/// # Example
///
/// ```rust,no_run
/// use dnssync_core::store::MemoryRecordStore;
/// use dnssync_core::traits::{ChangeRequest, RecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::with_requests(vec![
///         ChangeRequest::new(1, "A", "www", "192.0.2.1"),
///     ]);
///
///     let pending = store.fetch_pending().await?;
///     store.mark_processed(&pending[0].id).await?;
///     assert!(store.fetch_pending().await?.is_empty());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Vec<ChangeRequest>>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with requests
    pub fn with_requests(requests: Vec<ChangeRequest>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(requests)),
        }
    }

    /// Append a request
    pub async fn push(&self, request: ChangeRequest) {
        self.inner.write().await.push(request);
    }

    /// Snapshot of every request, processed or not
    pub async fn all(&self) -> Vec<ChangeRequest> {
        self.inner.read().await.clone()
    }

    /// Whether the request with `id` is marked processed
    pub async fn is_processed(&self, id: &RequestId) -> Option<bool> {
        self.inner
            .read()
            .await
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.processed)
    }

    /// Get the number of requests in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_pending(&self) -> Result<Vec<ChangeRequest>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .iter()
            .filter(|r| !r.processed)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: &RequestId) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        match guard.iter_mut().find(|r| &r.id == id) {
            Some(request) => {
                request.processed = true;
                Ok(())
            }
            None => Err(Error::store(format!("No change request with id {}", id))),
        }
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
