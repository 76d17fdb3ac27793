use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{video_dislike, video_like, video_rating};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::AppJson;
use crate::models::engagement::*;
use crate::state::AppState;
use crate::utils::video::find_visible_video;

/// Aggregates for `video_id` plus the state of `caller`, if any.
pub async fn engagement_summary<C: ConnectionTrait>(
    db: &C,
    video_id: i32,
    caller: Option<i32>,
) -> Result<EngagementSummary, AppError> {
    let likes = video_like::Entity::find()
        .filter(video_like::Column::VideoId.eq(video_id))
        .count(db)
        .await?;
    let dislikes = video_dislike::Entity::find()
        .filter(video_dislike::Column::VideoId.eq(video_id))
        .count(db)
        .await?;

    let (sum, count) = video_rating::Entity::find()
        .filter(video_rating::Column::VideoId.eq(video_id))
        .select_only()
        .column_as(video_rating::Column::Value.sum(), "total")
        .column_as(video_rating::Column::Value.count(), "n")
        .into_tuple::<(Option<i64>, i64)>()
        .one(db)
        .await?
        .unwrap_or((None, 0));
    let rating_count = std::cmp::Ord::max(count, 0) as u64;

    let mut summary = EngagementSummary {
        likes,
        dislikes,
        rating_average: rating_average(sum.unwrap_or(0), rating_count),
        rating_count,
        ..Default::default()
    };

    if let Some(user_id) = caller {
        summary.liked = video_like::Entity::find_by_id((user_id, video_id))
            .one(db)
            .await?
            .is_some();
        summary.disliked = video_dislike::Entity::find_by_id((user_id, video_id))
            .one(db)
            .await?
            .is_some();
        summary.my_rating = video_rating::Entity::find_by_id((user_id, video_id))
            .one(db)
            .await?
            .map(|r| r.value);
    }

    Ok(summary)
}

fn tolerate_duplicate(result: Result<(), DbErr>) -> Result<(), AppError> {
    match result {
        Ok(()) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = "Engagement",
    operation_id = "likeVideo",
    summary = "Like a video",
    description = "Records a like for the caller and clears any dislike they had on the same video. Repeating a like is a no-op.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn like_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EngagementSummary>, AppError> {
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    let txn = state.db.begin().await?;
    video_dislike::Entity::delete_by_id((auth_user.user_id, id))
        .exec(&txn)
        .await?;
    let like = video_like::ActiveModel {
        user_id: Set(auth_user.user_id),
        video_id: Set(id),
        created_at: Set(Utc::now()),
    };
    let inserted = video_like::Entity::insert(like)
        .on_conflict(
            OnConflict::columns([video_like::Column::UserId, video_like::Column::VideoId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map(|_| ());
    tolerate_duplicate(inserted)?;
    txn.commit().await?;

    Ok(Json(
        engagement_summary(&state.db, id, Some(auth_user.user_id)).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/like",
    tag = "Engagement",
    operation_id = "unlikeVideo",
    summary = "Remove a like",
    description = "Removes the caller's like, if any.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn unlike_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EngagementSummary>, AppError> {
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    video_like::Entity::delete_by_id((auth_user.user_id, id))
        .exec(&state.db)
        .await?;

    Ok(Json(
        engagement_summary(&state.db, id, Some(auth_user.user_id)).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/dislike",
    tag = "Engagement",
    operation_id = "dislikeVideo",
    summary = "Dislike a video",
    description = "Records a dislike for the caller and clears any like they had on the same video. Repeating a dislike is a no-op.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn dislike_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EngagementSummary>, AppError> {
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    let txn = state.db.begin().await?;
    video_like::Entity::delete_by_id((auth_user.user_id, id))
        .exec(&txn)
        .await?;
    let dislike = video_dislike::ActiveModel {
        user_id: Set(auth_user.user_id),
        video_id: Set(id),
        created_at: Set(Utc::now()),
    };
    let inserted = video_dislike::Entity::insert(dislike)
        .on_conflict(
            OnConflict::columns([
                video_dislike::Column::UserId,
                video_dislike::Column::VideoId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .map(|_| ());
    tolerate_duplicate(inserted)?;
    txn.commit().await?;

    Ok(Json(
        engagement_summary(&state.db, id, Some(auth_user.user_id)).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/dislike",
    tag = "Engagement",
    operation_id = "undislikeVideo",
    summary = "Remove a dislike",
    description = "Removes the caller's dislike, if any.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn undislike_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EngagementSummary>, AppError> {
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    video_dislike::Entity::delete_by_id((auth_user.user_id, id))
        .exec(&state.db)
        .await?;

    Ok(Json(
        engagement_summary(&state.db, id, Some(auth_user.user_id)).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/rating",
    tag = "Engagement",
    operation_id = "getVideoEngagement",
    summary = "Get engagement summary",
    description = "Like and dislike counts, the average rating and the number of ratings. Authenticated callers also get their own like, dislike and rating state.",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller), fields(id))]
pub async fn get_engagement(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EngagementSummary>, AppError> {
    find_visible_video(&state.db, id, caller.principal()).await?;
    let user_id = caller.0.as_ref().map(|u| u.user_id);
    Ok(Json(engagement_summary(&state.db, id, user_id).await?))
}

#[utoipa::path(
    put,
    path = "/{id}/rating",
    tag = "Engagement",
    operation_id = "rateVideo",
    summary = "Rate a video",
    description = "Sets the caller's rating (1 to 7), replacing any earlier rating of the same video.",
    params(("id" = i32, Path, description = "Video ID")),
    request_body = RateVideoRequest,
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 400, description = "Rating out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, value = payload.value))]
pub async fn rate_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RateVideoRequest>,
) -> Result<Json<EngagementSummary>, AppError> {
    validate_rating(payload.value)?;
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    let now = Utc::now();
    let rating = video_rating::ActiveModel {
        user_id: Set(auth_user.user_id),
        video_id: Set(id),
        value: Set(payload.value),
        created_at: Set(now),
        updated_at: Set(now),
    };
    video_rating::Entity::insert(rating)
        .on_conflict(
            OnConflict::columns([
                video_rating::Column::UserId,
                video_rating::Column::VideoId,
            ])
            .update_columns([video_rating::Column::Value, video_rating::Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await?;

    Ok(Json(
        engagement_summary(&state.db, id, Some(auth_user.user_id)).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/rating",
    tag = "Engagement",
    operation_id = "removeRating",
    summary = "Remove the caller's rating",
    params(("id" = i32, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Current engagement", body = EngagementSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video not visible to caller (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn remove_rating(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EngagementSummary>, AppError> {
    find_visible_video(&state.db, id, Some(auth_user.principal())).await?;

    video_rating::Entity::delete_by_id((auth_user.user_id, id))
        .exec(&state.db)
        .await?;

    Ok(Json(
        engagement_summary(&state.db, id, Some(auth_user.user_id)).await?,
    ))
}
