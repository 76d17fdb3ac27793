use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::range::ByteRange;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Content type reported when a blob carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Size and content type of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub size: u64,
    pub content_type: Option<String>,
}

impl BlobMeta {
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Key-addressed blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous blob.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(key, reader, content_type).await.map(|_| ())
    }

    /// Store data from an async reader under `key` and return the byte count.
    async fn put_stream(
        &self,
        key: &str,
        reader: BoxReader,
        content_type: &str,
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError>;

    /// Retrieve the inclusive byte range of a blob as a streaming reader.
    async fn get_range(&self, key: &str, range: ByteRange) -> Result<BoxReader, StorageError>;

    /// Size and content type of a blob.
    async fn stat(&self, key: &str) -> Result<BlobMeta, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Reject keys that are empty or could escape a path-based namespace.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.contains('\0') || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
