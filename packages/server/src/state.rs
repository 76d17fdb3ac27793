use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::pipeline::queue::DerivationQueue;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub derivations: DerivationQueue,
}
