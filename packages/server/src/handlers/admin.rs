use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::video;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::handlers::video::{VideoFilter, list_page};
use crate::models::admin::*;
use crate::models::video::{VideoListItem, VideoListResponse};
use crate::state::AppState;
use crate::utils::video::find_video;

#[utoipa::path(
    get,
    path = "/videos",
    tag = "Admin",
    operation_id = "listModerationQueue",
    summary = "List videos by moderation state",
    description = "Defaults to videos waiting for moderation. `status=approved` or `status=all` widens the listing. Requires the admin role.",
    params(AdminVideoQuery),
    responses(
        (status = 200, description = "Videos", body = VideoListResponse),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_moderation_queue(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AdminVideoQuery>,
) -> Result<Json<VideoListResponse>, AppError> {
    auth_user.require_admin()?;
    let status = StatusFilter::parse(query.status.as_deref())?;

    let filter = VideoFilter {
        approved: status.approved(),
        ..Default::default()
    };
    Ok(Json(
        list_page(&state.db, &filter, query.page, query.per_page).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/videos/{id}/moderation",
    tag = "Admin",
    operation_id = "moderateVideo",
    summary = "Approve or reject a video",
    description = "`approved` publishes the video; `rejected` hides it from public listings. Either decision can be reversed later. Requires the admin role.",
    params(("id" = i32, Path, description = "Video ID")),
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Decision applied", body = VideoListItem),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, status = %payload.status))]
pub async fn moderate_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ModerationRequest>,
) -> Result<Json<VideoListItem>, AppError> {
    auth_user.require_admin()?;
    let approved = decision_flag(&payload.status)?;

    let existing = find_video(&state.db, id).await?;
    if existing.is_approved == approved {
        return Ok(Json(existing.into()));
    }

    let mut active: video::ActiveModel = existing.into();
    active.is_approved = Set(approved);
    let model = active.update(&state.db).await?;

    info!(
        video_id = model.id,
        moderator = auth_user.user_id,
        approved,
        "Moderation decision applied"
    );
    Ok(Json(model.into()))
}
