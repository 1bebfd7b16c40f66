pub mod file;
pub mod memory;

use std::fmt;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::observability::metrics::Metrics;

pub use file::FileBackend;
pub use memory::MemoryBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Farmers,
    Vendors,
    Communities,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Farmers,
        Collection::Vendors,
        Collection::Communities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Farmers => "farmers",
            Collection::Vendors => "vendors",
            Collection::Communities => "communities",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw byte storage for whole collections.
///
/// `read` returns `None` for a collection that has never been written.
/// `write` must replace the collection in one step: a reader sees either the
/// previous contents or the new ones.
pub trait StorageBackend: Send + Sync {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, AppError>;
    fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), AppError>;
}

/// Load-all / replace-all access to typed record collections.
pub struct RecordStore {
    backend: Box<dyn StorageBackend>,
    metrics: Metrics,
}

impl RecordStore {
    pub fn new(backend: impl StorageBackend + 'static, metrics: Metrics) -> Self {
        Self {
            backend: Box::new(backend),
            metrics,
        }
    }

    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, AppError> {
        let start = Instant::now();
        let bytes = self.backend.read(collection)?;
        self.observe(collection, "load", start);

        let Some(bytes) = bytes else {
            return Ok(Vec::new());
        };

        let records: Vec<T> = serde_json::from_slice(&bytes).map_err(|err| {
            AppError::StorageUnavailable(format!("failed to decode {collection}: {err}"))
        })?;

        debug!(collection = %collection, records = records.len(), "collection loaded");
        Ok(records)
    }

    pub fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|err| {
            AppError::StorageUnavailable(format!("failed to encode {collection}: {err}"))
        })?;

        let start = Instant::now();
        self.backend.write(collection, &bytes)?;
        self.observe(collection, "save", start);

        debug!(collection = %collection, records = records.len(), "collection saved");
        Ok(())
    }

    /// Raw persisted bytes of a collection, as the backend holds them.
    #[cfg(test)]
    pub(crate) fn raw(&self, collection: Collection) -> Result<Option<Vec<u8>>, AppError> {
        self.backend.read(collection)
    }

    fn observe(&self, collection: Collection, op: &str, start: Instant) {
        self.metrics
            .store_operation_seconds
            .with_label_values(&[collection.name(), op])
            .observe(start.elapsed().as_secs_f64());
    }
}
