pub mod blob_keys;
pub mod config;
pub mod storage;

pub use config::{StorageBackend, StorageConfig};
