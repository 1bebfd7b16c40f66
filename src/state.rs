use crate::observability::metrics::Metrics;
use crate::store::{MemoryBackend, RecordStore, StorageBackend};

/// Shared handles for every core operation. Holds no per-user session data;
/// callers pass who is acting into each call.
pub struct AppState {
    pub store: RecordStore,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        let metrics = Metrics::new();

        Self {
            store: RecordStore::new(backend, metrics.clone()),
            metrics,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}
