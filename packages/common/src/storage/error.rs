use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob key is empty or escapes the store namespace.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// The requested byte range does not fit the blob.
    #[error("range {start}-{end} not satisfiable for blob of {size} bytes")]
    InvalidRange { start: u64, end: u64, size: u64 },

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },

    /// The remote object store rejected or failed the request.
    #[error("object store error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
