use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::storage::{BlobMeta, BlobStore, BoxReader, ByteRange, StorageError};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use server::entity::{comment, video, video_like};
use server::models::auth::{Principal, Role};
use server::pipeline::removal::remove_video;

use crate::common::{TestApp, routes};

const CLIP: &[u8] = b"removal";

/// How a stub store answers `delete`.
#[derive(Clone, Copy)]
enum DeleteBehavior {
    Fail,
    Hang,
}

/// Blob store whose deletes never succeed; counts delete attempts.
struct StuckStore {
    behavior: DeleteBehavior,
    deletes: AtomicUsize,
}

impl StuckStore {
    fn new(behavior: DeleteBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            deletes: AtomicUsize::new(0),
        })
    }
}

fn unavailable() -> StorageError {
    StorageError::Backend("store unavailable".into())
}

#[async_trait]
impl BlobStore for StuckStore {
    async fn put_stream(
        &self,
        _key: &str,
        _reader: BoxReader,
        _content_type: &str,
    ) -> Result<u64, StorageError> {
        Err(unavailable())
    }

    async fn get_stream(&self, _key: &str) -> Result<BoxReader, StorageError> {
        Err(unavailable())
    }

    async fn get_range(&self, _key: &str, _range: ByteRange) -> Result<BoxReader, StorageError> {
        Err(unavailable())
    }

    async fn stat(&self, _key: &str) -> Result<BlobMeta, StorageError> {
        Err(unavailable())
    }

    async fn delete(&self, _key: &str) -> Result<bool, StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            DeleteBehavior::Fail => Err(unavailable()),
            DeleteBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(true)
            }
        }
    }
}

async fn video_exists(app: &TestApp, id: i32) -> bool {
    video::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .is_some()
}

#[tokio::test]
async fn row_is_removed_when_blob_deletes_fail() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let id = app.upload_video(&owner, "Unlucky", CLIP).await;
    app.post_with_token(&routes::comments(id), &json!({ "text": "bye" }), &owner)
        .await;
    app.post_empty_with_token(&routes::like(id), &owner).await;

    let store = StuckStore::new(DeleteBehavior::Fail);
    let principal = Principal {
        user_id: 1,
        role: Role::User,
    };
    let budget = Duration::from_secs(5);
    let result = remove_video(&app.db, store.as_ref(), principal, id, budget).await;

    assert!(result.is_ok(), "{result:?}");
    assert!(!video_exists(&app, id).await);
    // Every candidate key was attempted despite the failures.
    assert!(store.deletes.load(Ordering::SeqCst) >= 5);

    let comments = comment::Entity::find()
        .filter(comment::Column::VideoId.eq(id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(comments, 0);
    let likes = video_like::Entity::find()
        .filter(video_like::Column::VideoId.eq(id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(likes, 0);
}

#[tokio::test]
async fn row_is_removed_when_blob_cleanup_times_out() {
    let app = TestApp::spawn().await;
    let admin = app.token(2, "admin");
    let id = app.upload_video(&admin, "Slow store", CLIP).await;

    let store = StuckStore::new(DeleteBehavior::Hang);
    let principal = Principal {
        user_id: 2,
        role: Role::Admin,
    };
    let started = Instant::now();
    let result = remove_video(
        &app.db,
        store.as_ref(),
        principal,
        id,
        Duration::from_millis(200),
    )
    .await;

    assert!(result.is_ok(), "{result:?}");
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(!video_exists(&app, id).await);
    assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(app.get_without_token(&routes::video(id)).await.status, 404);
}

#[tokio::test]
async fn failed_cleanup_still_requires_ownership() {
    let app = TestApp::spawn().await;
    let owner = app.token(3, "user");
    let id = app.upload_video(&owner, "Guarded", CLIP).await;

    let store = StuckStore::new(DeleteBehavior::Fail);
    let stranger = Principal {
        user_id: 4,
        role: Role::User,
    };
    let budget = Duration::from_secs(1);
    let result = remove_video(&app.db, store.as_ref(), stranger, id, budget).await;

    assert!(result.is_err());
    assert!(video_exists(&app, id).await);
    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
}
