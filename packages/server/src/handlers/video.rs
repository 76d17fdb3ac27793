use std::time::Duration;

use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{ExprTrait, Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comment, video};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::{AppJson, AppQuery};
use crate::handlers::engagement::engagement_summary;
use crate::models::auth::Role;
use crate::models::shared::{Pagination, escape_like, page_params, validate_title};
use crate::models::video::*;
use crate::pipeline::ingest::{UploadForm, checked_tags, existing_category, ingest};
use crate::pipeline::removal::remove_video;
use crate::state::AppState;
use crate::utils::tags::{join_tags, normalize_tags};
use crate::utils::video::{find_video, find_visible_video};

/// Body limit for the upload route.
pub fn upload_body_limit(max_bytes: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(max_bytes).unwrap_or(usize::MAX))
}

/// Composable predicate set for video listings: groups are ANDed, the
/// tags within the tag group are ORed.
#[derive(Debug, Default, Clone)]
pub struct VideoFilter {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub tags: Vec<String>,
    pub owner_id: Option<i32>,
    pub approved: Option<bool>,
}

impl VideoFilter {
    /// Public listing: approved videos only.
    pub fn public(query: &VideoListQuery) -> Self {
        Self {
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            category_id: query.category_id,
            tags: query.tags.as_deref().map(normalize_tags).unwrap_or_default(),
            owner_id: None,
            approved: Some(true),
        }
    }

    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(approved) = self.approved {
            cond = cond.add(video::Column::IsApproved.eq(approved));
        }
        if let Some(owner) = self.owner_id {
            cond = cond.add(video::Column::UserId.eq(owner));
        }
        if let Some(category) = self.category_id {
            cond = cond.add(video::Column::CategoryId.eq(category));
        }
        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            let mut any = Condition::any();
            for col in [
                video::Column::Title,
                video::Column::Description,
                video::Column::Tags,
            ] {
                any = any.add(
                    Expr::expr(Func::lower(Expr::col(col)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                );
            }
            cond = cond.add(any);
        }
        if !self.tags.is_empty() {
            let mut any = Condition::any();
            for tag in &self.tags {
                any = any.add(has_tag(tag));
            }
            cond = cond.add(any);
        }

        cond
    }
}

/// Whole-token match of `tag` inside the space-separated tags column.
fn has_tag(tag: &str) -> Condition {
    let tag = escape_like(tag);
    let like = |pattern: String| {
        Expr::col(video::Column::Tags).like(LikeExpr::new(pattern).escape('\\'))
    };
    Condition::any()
        .add(like(tag.clone()))
        .add(like(format!("{tag} %")))
        .add(like(format!("% {tag}")))
        .add(like(format!("% {tag} %")))
}

pub(crate) async fn list_page(
    db: &DatabaseConnection,
    filter: &VideoFilter,
    page: Option<u64>,
    per_page: Option<u64>,
) -> Result<VideoListResponse, AppError> {
    let (page, per_page) = page_params(page, per_page);
    let select = video::Entity::find().filter(filter.condition());

    let total = select.clone().paginate(db, per_page).num_items().await?;
    let data = select
        .order_by_desc(video::Column::CreatedAt)
        .order_by_desc(video::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(db)
        .await?
        .into_iter()
        .map(VideoListItem::from)
        .collect();

    Ok(VideoListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    })
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Videos",
    operation_id = "listVideos",
    summary = "List approved videos",
    description = "Public listing of approved videos, newest first. `search` matches title, description or tags case-insensitively; `tags` matches videos carrying any of the given tags; all filters combine with AND.",
    params(VideoListQuery),
    responses(
        (status = 200, description = "Videos", body = VideoListResponse),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_videos(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VideoListQuery>,
) -> Result<Json<VideoListResponse>, AppError> {
    let filter = VideoFilter::public(&query);
    Ok(Json(
        list_page(&state.db, &filter, query.page, query.per_page).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/mine",
    tag = "Videos",
    operation_id = "listMyVideos",
    summary = "List the caller's videos",
    description = "All of the caller's uploads, pending ones included, newest first.",
    params(VideoListQuery),
    responses(
        (status = 200, description = "Videos", body = VideoListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_my_videos(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<VideoListQuery>,
) -> Result<Json<VideoListResponse>, AppError> {
    let filter = VideoFilter {
        owner_id: Some(auth_user.user_id),
        approved: None,
        ..VideoFilter::public(&query)
    };
    Ok(Json(
        list_page(&state.db, &filter, query.page, query.per_page).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Videos",
    operation_id = "uploadVideo",
    summary = "Upload a video",
    description = "Multipart form with `file` (required), `title` (required), and optional `description`, `tags`, `category_id` and `product_link`. Tags are split on commas and whitespace and normalized to lowercase `#tag` form; any banned tag rejects the upload. `product_link` is kept only for business accounts. Admin uploads are published immediately, all others wait for moderation. Thumbnails and renditions are derived in the background after the response.",
    request_body(content_type = "multipart/form-data", description = "Video file and metadata"),
    responses(
        (status = 201, description = "Video stored", body = UploadVideoResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = UploadForm::read(
        &mut multipart,
        &state.config.media.work_root(),
        state.config.storage.max_blob_size,
    )
    .await?;

    let model = ingest(
        &state.db,
        state.blob_store.as_ref(),
        &state.derivations,
        auth_user.principal(),
        form,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadVideoResponse {
            id: model.id,
            status: if model.is_approved {
                "approved"
            } else {
                "pending"
            },
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Videos",
    operation_id = "getVideo",
    summary = "Get video details",
    description = "Metadata, available qualities, comment count and engagement. Pending videos are only visible to their owner and administrators.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video details", body = VideoDetailResponse),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video pending moderation (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller), fields(id))]
pub async fn get_video(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<VideoDetailResponse>, AppError> {
    let model = find_visible_video(&state.db, id, caller.principal()).await?;

    let comment_count = comment::Entity::find()
        .filter(comment::Column::VideoId.eq(id))
        .count(&state.db)
        .await?;
    let user_id = caller.0.as_ref().map(|u| u.user_id);
    let engagement = engagement_summary(&state.db, id, user_id).await?;

    Ok(Json(VideoDetailResponse::new(
        model,
        comment_count,
        engagement,
    )))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Videos",
    operation_id = "updateVideo",
    summary = "Edit video metadata",
    description = "Owner or administrator only. Absent fields are left unchanged. Tags follow the upload rules, a category that does not exist detaches the video, and `product_link` is only applied for business and admin editors.",
    params(("id" = i32, Path, description = "Video ID")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Video updated", body = VideoListItem),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateVideoRequest>,
) -> Result<Json<VideoListItem>, AppError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }

    let existing = find_video(&state.db, id).await?;
    if !auth_user.principal().can_manage(existing.user_id) {
        return Err(AppError::PermissionDenied);
    }
    if payload == UpdateVideoRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: video::ActiveModel = existing.into();
    if let Some(title) = &payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = &payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(tags) = &payload.tags {
        active.tags = Set(join_tags(&checked_tags(&state.db, tags).await?));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(existing_category(&state.db, category_id).await?);
    }
    if let Some(link) = payload.product_link
        && matches!(auth_user.role, Role::Business | Role::Admin)
    {
        active.product_link = Set(link.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    }

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Videos",
    operation_id = "deleteVideo",
    summary = "Delete a video",
    description = "Owner or administrator only. Removes the video with its likes, dislikes, ratings and comments, then removes its stored media on a best-effort basis.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    remove_video(
        &state.db,
        state.blob_store.as_ref(),
        auth_user.principal(),
        id,
        Duration::from_secs(state.config.storage.delete_timeout_secs),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
