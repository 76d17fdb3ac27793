mod error;
mod hash;
mod range;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

use std::sync::Arc;

pub use error::StorageError;
pub use hash::KeyHash;
pub use range::ByteRange;
pub use traits::{BlobMeta, BlobStore, BoxReader, DEFAULT_CONTENT_TYPE};

use crate::config::{StorageBackend, StorageConfig};

/// Build the blob store selected by `config.backend`.
pub async fn open_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store =
                filesystem::FilesystemBlobStore::new(config.path.clone(), config.max_blob_size)
                    .await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => Ok(Arc::new(s3::S3BlobStore::new(&config.s3)?)),
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StorageError::Backend(
            "built without the object-storage feature".into(),
        )),
    }
}
