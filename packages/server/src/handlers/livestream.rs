use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::Order;
use sea_orm::*;
use tracing::instrument;

use crate::entity::live_stream;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::auth::Principal;
use crate::models::livestream::*;
use crate::state::AppState;

async fn find_stream<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<live_stream::Model, AppError> {
    live_stream::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Live stream not found".into()))
}

async fn find_managed_stream<C: ConnectionTrait>(
    db: &C,
    id: i32,
    principal: Principal,
) -> Result<live_stream::Model, AppError> {
    let stream = find_stream(db, id).await?;
    if !principal.can_manage(stream.user_id) {
        return Err(AppError::PermissionDenied);
    }
    Ok(stream)
}

/// Upcoming streams soonest first, the rest most recent first.
fn listing_order(status: Option<LiveStatus>) -> (&'static str, Order) {
    match status {
        Some(LiveStatus::Scheduled) => ("COALESCE(scheduled_at, created_at)", Order::Asc),
        Some(LiveStatus::Ended) => ("COALESCE(ended_at, created_at)", Order::Desc),
        _ => ("COALESCE(started_at, created_at)", Order::Desc),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Live Streams",
    operation_id = "listLiveStreams",
    summary = "List live streams",
    description = "Streams in one status (`live` by default, or `all`). Scheduled streams are ordered soonest first, others most recent first. `limit` defaults to 20 and is capped at 100.",
    params(LiveStreamListQuery),
    responses(
        (status = 200, description = "Live streams", body = Vec<LiveStreamResponse>),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_live_streams(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LiveStreamListQuery>,
) -> Result<Json<Vec<LiveStreamResponse>>, AppError> {
    let status = query.status_filter()?;
    let mut select = live_stream::Entity::find();
    if let Some(status) = status {
        select = select.filter(live_stream::Column::Status.eq(status.as_str()));
    }
    let (order_expr, order) = listing_order(status);

    let streams = select
        .order_by(Expr::cust(order_expr), order)
        .order_by_desc(live_stream::Column::Id)
        .limit(Some(query.effective_limit()))
        .all(&state.db)
        .await?;

    Ok(Json(streams.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/mine",
    tag = "Live Streams",
    operation_id = "listMyLiveStreams",
    summary = "List the caller's live streams",
    params(MyLiveStreamQuery),
    responses(
        (status = 200, description = "Caller's live streams", body = Vec<LiveStreamResponse>),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_my_live_streams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MyLiveStreamQuery>,
) -> Result<Json<Vec<LiveStreamResponse>>, AppError> {
    let mut select =
        live_stream::Entity::find().filter(live_stream::Column::UserId.eq(auth_user.user_id));
    if let Some(status) = query.status_filter()? {
        select = select.filter(live_stream::Column::Status.eq(status.as_str()));
    }

    let streams = select
        .order_by(
            Expr::cust("COALESCE(started_at, scheduled_at, created_at)"),
            Order::Desc,
        )
        .order_by_desc(live_stream::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(streams.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Live Streams",
    operation_id = "createLiveStream",
    summary = "Announce a live stream",
    description = "Title and stream URL are required. Status defaults to `scheduled`; creating a stream as `live` stamps its start time.",
    request_body = CreateLiveStreamRequest,
    responses(
        (status = 201, description = "Live stream created", body = LiveStreamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_live_stream(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateLiveStreamRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_stream_fields(&payload.title, &payload.stream_url)?;
    let status = payload.initial_status()?;
    let scheduled_at = match payload.scheduled_at.as_deref() {
        Some(raw) => parse_schedule(raw)?,
        None => None,
    };
    let now = Utc::now();

    let new_stream = live_stream::ActiveModel {
        user_id: Set(auth_user.user_id),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        stream_url: Set(payload.stream_url.trim().to_string()),
        thumbnail_url: Set(payload.thumbnail_url.trim().to_string()),
        status: Set(status.as_str().to_string()),
        scheduled_at: Set(scheduled_at),
        started_at: Set((status == LiveStatus::Live).then_some(now)),
        ended_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    };
    let model = new_stream.insert(&state.db).await?;
    tracing::info!(stream_id = model.id, status = status.as_str(), "Live stream created");

    Ok((StatusCode::CREATED, Json(LiveStreamResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Live Streams",
    operation_id = "getLiveStream",
    summary = "Get a live stream",
    params(("id" = i32, Path, description = "Live stream ID")),
    responses(
        (status = 200, description = "Live stream", body = LiveStreamResponse),
        (status = 404, description = "Live stream not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_live_stream(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LiveStreamResponse>, AppError> {
    Ok(Json(find_stream(&state.db, id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Live Streams",
    operation_id = "updateLiveStream",
    summary = "Edit a live stream",
    description = "Owner or administrator only. Replaces title, description, stream URL and thumbnail URL. An absent `scheduled_at` keeps the current schedule and a blank one clears it. Status is changed through `/status`.",
    params(("id" = i32, Path, description = "Live stream ID")),
    request_body = UpdateLiveStreamRequest,
    responses(
        (status = 200, description = "Live stream updated", body = LiveStreamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Live stream not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_live_stream(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateLiveStreamRequest>,
) -> Result<Json<LiveStreamResponse>, AppError> {
    let existing = find_managed_stream(&state.db, id, auth_user.principal()).await?;
    validate_stream_fields(&payload.title, &payload.stream_url)?;

    let mut active: live_stream::ActiveModel = existing.into();
    active.title = Set(payload.title.trim().to_string());
    active.description = Set(payload.description.trim().to_string());
    active.stream_url = Set(payload.stream_url.trim().to_string());
    active.thumbnail_url = Set(payload.thumbnail_url.trim().to_string());
    if let Some(raw) = payload.scheduled_at.as_deref() {
        active.scheduled_at = Set(parse_schedule(raw)?);
    }

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    put,
    path = "/{id}/status",
    tag = "Live Streams",
    operation_id = "setLiveStreamStatus",
    summary = "Change a live stream's status",
    description = "Owner or administrator only. Going `live` stamps the start time if unset and clears the end time; returning to `scheduled` clears both; `ended` stamps the end time.",
    params(("id" = i32, Path, description = "Live stream ID")),
    request_body = LiveStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = LiveStreamResponse),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Live stream not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn set_live_stream_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<LiveStatusRequest>,
) -> Result<Json<LiveStreamResponse>, AppError> {
    let existing = find_managed_stream(&state.db, id, auth_user.principal()).await?;
    let status = payload.status()?;
    let now = Utc::now();

    let started_at = existing.started_at;
    let mut active: live_stream::ActiveModel = existing.into();
    active.status = Set(status.as_str().to_string());
    match status {
        LiveStatus::Live => {
            active.started_at = Set(started_at.or(Some(now)));
            active.ended_at = Set(None);
        }
        LiveStatus::Scheduled => {
            active.started_at = Set(None);
            active.ended_at = Set(None);
        }
        LiveStatus::Ended => {
            active.ended_at = Set(Some(now));
        }
    }

    let model = active.update(&state.db).await?;
    tracing::info!(stream_id = id, status = status.as_str(), "Live stream status changed");
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Live Streams",
    operation_id = "deleteLiveStream",
    summary = "Delete a live stream",
    description = "Owner or administrator only.",
    params(("id" = i32, Path, description = "Live stream ID")),
    responses(
        (status = 204, description = "Live stream deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Live stream not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_live_stream(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_managed_stream(&state.db, id, auth_user.principal()).await?;
    live_stream::Entity::delete_by_id(existing.id)
        .exec(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
