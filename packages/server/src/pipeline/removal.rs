use std::time::Duration;

use common::blob_keys::DerivedKeys;
use common::storage::BlobStore;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{comment, video, video_dislike, video_like, video_rating};
use crate::error::AppError;
use crate::models::auth::Principal;

/// Every blob key that may belong to `video`: the original, recorded derived
/// keys, and the suffix-convention keys for anything not recorded yet.
pub fn candidate_keys(video: &video::Model) -> Vec<String> {
    let guessed = DerivedKeys::for_original(&video.original_key);
    let recorded = [
        video.rendition_720p_key.as_deref(),
        video.rendition_480p_key.as_deref(),
        video.thumbnail_key.as_deref(),
        video.thumbnail_static_key.as_deref(),
    ];

    let mut keys = vec![video.original_key.clone()];
    let all = recorded
        .into_iter()
        .flatten()
        .chain(guessed.renditions())
        .chain(guessed.thumbnails());
    for key in all {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Delete a video row and its engagement rows, then try to remove its blobs.
///
/// Only the owner or an administrator may delete. The committed row delete
/// is the success criterion; blob removal is bounded by `cleanup_budget` and
/// its failures are only logged.
pub async fn remove_video(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    principal: Principal,
    video_id: i32,
    cleanup_budget: Duration,
) -> Result<(), AppError> {
    let txn = db.begin().await?;

    let video = video::Entity::find_by_id(video_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;
    if !principal.can_manage(video.user_id) {
        return Err(AppError::PermissionDenied);
    }

    video_like::Entity::delete_many()
        .filter(video_like::Column::VideoId.eq(video_id))
        .exec(&txn)
        .await?;
    video_dislike::Entity::delete_many()
        .filter(video_dislike::Column::VideoId.eq(video_id))
        .exec(&txn)
        .await?;
    video_rating::Entity::delete_many()
        .filter(video_rating::Column::VideoId.eq(video_id))
        .exec(&txn)
        .await?;
    comment::Entity::delete_many()
        .filter(comment::Column::VideoId.eq(video_id))
        .exec(&txn)
        .await?;
    video::Entity::delete_by_id(video_id).exec(&txn).await?;

    txn.commit().await?;
    info!(video_id, by = principal.user_id, "Video deleted");

    let keys = candidate_keys(&video);
    if tokio::time::timeout(cleanup_budget, remove_blobs(store, video_id, &keys))
        .await
        .is_err()
    {
        warn!(
            video_id,
            budget_secs = cleanup_budget.as_secs(),
            "Blob cleanup timed out; remaining blobs are orphaned"
        );
    }

    Ok(())
}

async fn remove_blobs(store: &dyn BlobStore, video_id: i32, keys: &[String]) {
    for key in keys {
        if let Err(e) = store.delete(key).await {
            warn!(video_id, blob_key = %key, error = %e, "Failed to remove blob");
        }
    }
}
