use sea_orm::EntityTrait;

use crate::entity::video;
use crate::error::AppError;
use crate::models::auth::Principal;

/// Look up a video by ID, returning 404 if not found.
pub async fn find_video<C: sea_orm::ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<video::Model, AppError> {
    video::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))
}

/// Moderation gate for single-video reads: approved videos are public,
/// pending ones are visible to their owner and administrators only.
pub fn ensure_visible(video: &video::Model, caller: Option<Principal>) -> Result<(), AppError> {
    if video.is_approved {
        return Ok(());
    }
    match caller {
        Some(p) if p.can_manage(video.user_id) => Ok(()),
        _ => Err(AppError::PermissionDenied),
    }
}

/// [`find_video`] followed by [`ensure_visible`].
pub async fn find_visible_video<C: sea_orm::ConnectionTrait>(
    db: &C,
    id: i32,
    caller: Option<Principal>,
) -> Result<video::Model, AppError> {
    let video = find_video(db, id).await?;
    ensure_visible(&video, caller)?;
    Ok(video)
}
