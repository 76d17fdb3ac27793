use async_trait::async_trait;
use futures::TryStreamExt;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tokio_util::io::StreamReader;
use tracing::warn;

use super::error::StorageError;
use super::range::ByteRange;
use super::traits::{BlobMeta, BlobStore, BoxReader, validate_key};
use crate::config::S3Config;

/// S3-compatible object storage (AWS, MinIO, ...).
///
/// The crate is built without `fail-on-err`, so non-2xx responses come
/// back as status codes and are mapped here.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
}

impl S3BlobStore {
    pub fn new(config: &S3Config) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid S3 credentials: {e}")))?;

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid S3 region: {e}")))?,
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }
        Ok(Self { bucket })
    }
}

fn backend_err(err: s3::error::S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn check_status(key: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {key}"
        ))),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_stream(
        &self,
        key: &str,
        mut reader: BoxReader,
        content_type: &str,
    ) -> Result<u64, StorageError> {
        validate_key(key)?;
        let response = self
            .bucket
            .put_object_stream_with_content_type(&mut reader, key, content_type)
            .await
            .map_err(backend_err)?;
        check_status(key, response.status_code())?;
        Ok(response.uploaded_bytes() as u64)
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        validate_key(key)?;
        let response = self
            .bucket
            .get_object_stream(key)
            .await
            .map_err(backend_err)?;
        check_status(key, response.status_code)?;
        let stream = response
            .bytes
            .map_err(|e| std::io::Error::other(e.to_string()));
        Ok(Box::new(StreamReader::new(stream)))
    }

    async fn get_range(&self, key: &str, range: ByteRange) -> Result<BoxReader, StorageError> {
        let meta = self.stat(key).await?;
        range.check(meta.size)?;

        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        let bucket = self.bucket.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let result = bucket
                .get_object_range_to_writer(&key, range.start, Some(range.end), &mut writer)
                .await;
            match result {
                Ok(status) if (200..300).contains(&status) => {}
                Ok(status) => warn!(key = %key, status, "Range fetch returned non-success status"),
                // The reader sees a truncated body once the writer drops.
                Err(e) => warn!(key = %key, error = %e, "Range fetch failed mid-stream"),
            }
        });
        Ok(Box::new(reader))
    }

    async fn stat(&self, key: &str) -> Result<BlobMeta, StorageError> {
        validate_key(key)?;
        let (head, status) = self.bucket.head_object(key).await.map_err(backend_err)?;
        check_status(key, status)?;
        Ok(BlobMeta {
            size: head
                .content_length
                .and_then(|len| u64::try_from(len).ok())
                .unwrap_or(0),
            content_type: head.content_type.filter(|ct| !ct.is_empty()),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let response = self.bucket.delete_object(key).await.map_err(backend_err)?;
        match response.status_code() {
            404 => Ok(false),
            status => check_status(key, status).map(|_| true),
        }
    }
}
