use dashmap::DashMap;

use crate::error::AppError;
use crate::store::{Collection, StorageBackend};

/// Keeps serialized collections in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: DashMap<Collection, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn insert_raw(&self, collection: Collection, bytes: Vec<u8>) {
        self.collections.insert(collection, bytes);
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self
            .collections
            .get(&collection)
            .map(|entry| entry.value().clone()))
    }

    fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), AppError> {
        self.collections.insert(collection, bytes.to_vec());
        Ok(())
    }
}
