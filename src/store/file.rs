use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::AppError;
use crate::store::{Collection, StorageBackend};

const EMPTY_COLLECTION: &[u8] = b"[]";

/// One pretty-printed JSON array per collection inside a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| storage_error("create", &dir, err))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    fn staging(&self, collection: Collection) -> Result<NamedTempFile, AppError> {
        tempfile::Builder::new()
            .prefix(&format!("{}.", collection.file_name()))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|err| storage_error("stage", &self.dir, err))
    }

    /// Writes `bytes` to a private staging file in the data directory and
    /// syncs it. The staging file is removed when dropped unpersisted.
    fn stage(&self, collection: Collection, bytes: &[u8]) -> Result<NamedTempFile, AppError> {
        let mut staging = self.staging(collection)?;

        let write_staging = |file: &mut NamedTempFile| -> io::Result<()> {
            file.write_all(bytes)?;
            file.as_file().sync_all()
        };
        write_staging(&mut staging).map_err(|err| storage_error("write", staging.path(), err))?;

        Ok(staging)
    }

    fn replace(&self, collection: Collection, bytes: &[u8]) -> Result<(), AppError> {
        let target = self.path(collection);
        let staging = self.stage(collection, bytes)?;

        staging
            .persist(&target)
            .map_err(|err| storage_error("replace", &target, err.error))?;
        Ok(())
    }

    /// Creates an empty collection file unless another writer got there
    /// first, then returns whatever the file now holds.
    fn create_empty(&self, collection: Collection) -> Result<Vec<u8>, AppError> {
        let target = self.path(collection);
        let staging = self.stage(collection, EMPTY_COLLECTION)?;

        match staging.persist_noclobber(&target) {
            Ok(_) => {
                info!(path = %target.display(), "created empty collection file");
                Ok(EMPTY_COLLECTION.to_vec())
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                fs::read(&target).map_err(|err| storage_error("read", &target, err))
            }
            Err(err) => Err(storage_error("create", &target, err.error)),
        }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.path(collection);

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.create_empty(collection).map(Some)
            }
            Err(err) => Err(storage_error("read", &path, err)),
        }
    }

    fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), AppError> {
        self.replace(collection, bytes)
    }
}

fn storage_error(action: &str, path: &Path, err: io::Error) -> AppError {
    AppError::StorageUnavailable(format!("failed to {action} {}: {err}", path.display()))
}
