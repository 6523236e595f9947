//! FileStore port - removal of uploaded attachment bytes.
//!
//! Upload handling itself is an external collaborator; the core only needs
//! to delete files when purging messages or sweeping orphans.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Deletes stored attachment files by their storage path.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Removes one stored file. Missing files are not an error; the row
    /// may outlive the bytes after a partial cleanup.
    async fn remove(&self, storage_path: &str) -> Result<(), DomainError>;
}
