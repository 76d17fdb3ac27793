use std::io::SeekFrom;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::hash::KeyHash;
use super::range::ByteRange;
use super::traits::{BlobMeta, BlobStore, BoxReader, validate_key};

/// Filesystem-backed blob store.
///
/// Keys are hashed into a Git-style sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}`, with the
/// declared content type kept in a `.type` sidecar next to the blob.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        let hash = KeyHash::of_key(key);
        self.base_path
            .join(hash.shard_prefix())
            .join(hash.shard_suffix())
    }

    fn type_path(&self, key: &str) -> PathBuf {
        self.blob_path(key).with_extension("type")
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn open_existing(&self, key: &str) -> Result<fs::File, StorageError> {
        validate_key(key)?;
        match fs::File::open(self.blob_path(key)).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(
        &self,
        key: &str,
        mut reader: BoxReader,
        content_type: &str,
    ) -> Result<u64, StorageError> {
        validate_key(key)?;
        let temp_path = self.temp_path();
        let mut total_bytes: u64 = 0;

        let mut buf = vec![0u8; 64 * 1024];
        let mut temp_file = fs::File::create(&temp_path).await?;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    drop(temp_file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e.into());
                }
            };
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                drop(temp_file);
                let _ = fs::remove_file(&temp_path).await;
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        drop(temp_file);

        let blob_path = self.blob_path(key);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        fs::write(self.type_path(key), content_type).await?;

        Ok(total_bytes)
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        let file = self.open_existing(key).await?;
        Ok(Box::new(BufReader::new(file)))
    }

    async fn get_range(&self, key: &str, range: ByteRange) -> Result<BoxReader, StorageError> {
        let mut file = self.open_existing(key).await?;
        let size = file.metadata().await?.len();
        range.check(size)?;
        file.seek(SeekFrom::Start(range.start)).await?;
        Ok(Box::new(BufReader::new(file).take(range.len())))
    }

    async fn stat(&self, key: &str) -> Result<BlobMeta, StorageError> {
        validate_key(key)?;
        let size = match fs::metadata(self.blob_path(key)).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = fs::read_to_string(self.type_path(key))
            .await
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(BlobMeta { size, content_type })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let _ = fs::remove_file(self.type_path(key)).await;
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
