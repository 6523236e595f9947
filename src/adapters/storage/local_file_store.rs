//! Local filesystem implementation of FileStore.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::FileStore;

/// Removes attachment files relative to a base uploads directory.
#[derive(Clone)]
pub struct LocalFileStore {
    base_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, storage_path: &str) -> Result<PathBuf, DomainError> {
        // Storage paths come from our own rows, but refuse traversal anyway.
        if storage_path.contains("..") {
            return Err(DomainError::new(
                ErrorCode::StorageError,
                format!("Refusing storage path '{}'", storage_path),
            ));
        }
        Ok(self.base_dir.join(storage_path))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn remove(&self, storage_path: &str) -> Result<(), DomainError> {
        let path = self.resolve(storage_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Attachment file already gone");
                Ok(())
            }
            Err(e) => Err(DomainError::new(
                ErrorCode::StorageError,
                format!("Failed to remove '{}': {}", path.display(), e),
            )),
        }
    }
}
