use common::storage::StorageError;
use thiserror::Error;

use crate::media::error::MediaError;

/// Failure of one derivation stage. Never surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("media tool error: {0}")]
    Media(#[from] MediaError),

    #[error("scratch IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no preview frame could be extracted")]
    NoFrames,

    #[error("metadata update failed: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, DerivationError>;
