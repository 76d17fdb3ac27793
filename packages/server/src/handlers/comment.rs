use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::comment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::comment::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;
use crate::utils::video::find_visible_video;

#[utoipa::path(
    get,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "listComments",
    summary = "List comments on a video",
    description = "Newest first, paginated. Comments on a pending video are only visible to its owner and administrators.",
    params(("id" = i32, Path, description = "Video ID"), CommentListQuery),
    responses(
        (status = 200, description = "Comments", body = CommentListResponse),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, query), fields(id))]
pub async fn list_comments(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<CommentListQuery>,
) -> Result<Json<CommentListResponse>, AppError> {
    find_visible_video(&state.db, id, caller.principal()).await?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let select = comment::Entity::find().filter(comment::Column::VideoId.eq(id));
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(comment::Column::CreatedAt)
        .order_by_desc(comment::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();

    Ok(Json(CommentListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/comments",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Comment on a video",
    description = "Text must be non-empty and at most 2000 characters. The video must be visible to the caller.",
    params(("id" = i32, Path, description = "Video ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn create_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_comment(&payload.text)?;
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    let new_comment = comment::ActiveModel {
        video_id: Set(id),
        user_id: Set(auth_user.user_id),
        text: Set(payload.text.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let model = new_comment.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(model))))
}

#[utoipa::path(
    delete,
    path = "/{id}/comments/{comment_id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment",
    description = "Only the comment's author or an administrator may delete it.",
    params(
        ("id" = i32, Path, description = "Video ID"),
        ("comment_id" = i32, Path, description = "Comment ID"),
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, comment_id))]
pub async fn delete_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let existing = comment::Entity::find_by_id(comment_id)
        .one(&state.db)
        .await?
        .filter(|c| c.video_id == id)
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    if !auth_user.principal().can_manage(existing.user_id) {
        return Err(AppError::PermissionDenied);
    }

    comment::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
