//! File storage collaborator.
//!
//! The core only needs a stable reference string and a byte length back from
//! whatever stores the bytes; the physical layout is the collaborator's
//! concern. [`LocalFileStorage`] is the default implementation, writing into
//! date-bucketed directories under a configured root.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FileStorageError {
    #[error("file storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The stored file's stable reference plus its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub reference: String,
    pub byte_len: u64,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists `bytes`, using `path_hint` (typically the original file
    /// name) to make the resulting reference readable.
    async fn store(&self, bytes: &[u8], path_hint: &str) -> Result<StoredFile, FileStorageError>;
}

/// Stores uploads on the local filesystem under
/// `<root>/uploads/<year>/<month>/<day>/<uuid>_<hint>`.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, bytes: &[u8], path_hint: &str) -> Result<StoredFile, FileStorageError> {
        let bucket = Utc::now().format("uploads/%Y/%m/%d").to_string();
        let dir = self.root.join(&bucket);
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize(path_hint));
        fs::write(dir.join(&file_name), bytes).await?;

        let reference = format!("{bucket}/{file_name}");
        debug!(reference = %reference, bytes = bytes.len(), "stored uploaded file");

        Ok(StoredFile {
            reference,
            byte_len: bytes.len() as u64,
        })
    }
}

/// Keeps only filesystem-safe characters from a client-supplied name.
fn sanitize(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
