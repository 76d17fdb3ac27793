use std::path::PathBuf;

use serde::Deserialize;

/// Which blob store implementation backs the gateway.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Connection settings for S3-compatible object storage.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    /// Bucket name. Default: "videos".
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint (MinIO etc). When unset, `region` must be an AWS region.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style addressing. Default: true.
    #[serde(default = "default_s3_path_style")]
    pub path_style: bool,
}

fn default_s3_bucket() -> String {
    "videos".into()
}
fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_s3_path_style() -> bool {
    true
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: default_s3_bucket(),
            region: default_s3_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: default_s3_path_style(),
        }
    }
}

/// Blob store configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Largest accepted blob in bytes. Default: 2 GiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Time budget for best-effort blob removal on video delete. Default: 10.
    #[serde(default = "default_delete_timeout_secs")]
    pub delete_timeout_secs: u64,
    #[serde(default)]
    pub s3: S3Config,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_blob_size() -> u64 {
    2 * 1024 * 1024 * 1024
}
fn default_delete_timeout_secs() -> u64 {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            max_blob_size: default_max_blob_size(),
            delete_timeout_secs: default_delete_timeout_secs(),
            s3: S3Config::default(),
        }
    }
}
