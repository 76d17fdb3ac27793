use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use common::storage::BoxReader;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::*;
use tokio_util::io::ReaderStream;
use tracing::{instrument, warn};

use crate::entity::video;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::MaybeAuthUser;
use crate::extractors::json::AppQuery;
use crate::models::video::{ContentQuery, Quality, ThumbnailQuery, ThumbnailVariant};
use crate::state::AppState;
use crate::utils::range::parse_range;
use crate::utils::video::find_visible_video;

#[utoipa::path(
    get,
    path = "/{id}/content",
    tag = "Videos",
    operation_id = "streamVideo",
    summary = "Stream video bytes",
    description = "Streams the original or, with `quality=720p|480p`, a rendition; a rendition that is not ready yet falls back to the original. Honors a single `Range` header in the `start-end`, `start-` and `-suffix` forms. Pending videos are only streamable by their owner and administrators. Each successful fetch counts a view.",
    params(("id" = i32, Path, description = "Video ID"), ContentQuery),
    responses(
        (status = 200, description = "Whole object", content_type = "application/octet-stream"),
        (status = 206, description = "Requested byte range", content_type = "application/octet-stream"),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video pending moderation (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Video or media not found (NOT_FOUND)", body = ErrorBody),
        (status = 416, description = "Unsatisfiable range (RANGE_NOT_SATISFIABLE)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, query, headers), fields(id, quality = ?query.quality))]
pub async fn stream_video(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<ContentQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let model = find_visible_video(&state.db, id, caller.principal()).await?;
    let key = Quality::parse(query.quality.as_deref()).select_key(&model);

    let meta = state.blob_store.stat(key).await?;
    let size = meta.size;
    let content_type = meta.content_type_or_default().to_string();

    let response = match headers.get(header::RANGE) {
        None => {
            let reader = state.blob_store.get_stream(key).await?;
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, size.to_string())
                .header(header::ACCEPT_RANGES, "bytes")
                .body(stream_body(reader))
        }
        Some(raw) => {
            let range = raw
                .to_str()
                .ok()
                .and_then(|raw| parse_range(raw, size))
                .ok_or(AppError::RangeNotSatisfiable { size })?;
            let reader = state.blob_store.get_range(key, range).await?;
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, range.len().to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{size}", range.start, range.end),
                )
                .header(header::ACCEPT_RANGES, "bytes")
                .body(stream_body(reader))
        }
    }
    .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    count_view(state.db.clone(), id);
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/{id}/thumbnail",
    tag = "Videos",
    operation_id = "getVideoThumbnail",
    summary = "Get the preview image",
    description = "`variant=animated` (default) serves the looping GIF preview, `variant=static` the still frame. If the requested form is missing the other one is served. 404 until derivation has produced either.",
    params(("id" = i32, Path, description = "Video ID"), ThumbnailQuery),
    responses(
        (status = 200, description = "Preview image", content_type = "image/gif"),
        (status = 400, description = "Unknown variant (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Video pending moderation (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No preview available (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, caller, query), fields(id))]
pub async fn get_thumbnail(
    caller: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<ThumbnailQuery>,
) -> Result<Response, AppError> {
    let variant = ThumbnailVariant::parse(query.variant.as_deref())?;
    let model = find_visible_video(&state.db, id, caller.principal()).await?;
    let key = variant
        .select_key(&model)
        .ok_or_else(|| AppError::NotFound("Thumbnail not available".into()))?;

    let meta = state.blob_store.stat(key).await?;
    let reader = state.blob_store.get_stream(key).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, meta.content_type_or_default())
        .header(header::CONTENT_LENGTH, meta.size.to_string())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(stream_body(reader))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

fn stream_body(reader: BoxReader) -> Body {
    Body::from_stream(ReaderStream::new(reader))
}

/// Increment the view counter without holding up the response.
fn count_view(db: DatabaseConnection, video_id: i32) {
    tokio::spawn(async move {
        let result = video::Entity::update_many()
            .col_expr(
                video::Column::Views,
                Expr::col(video::Column::Views).add(1),
            )
            .filter(video::Column::Id.eq(video_id))
            .exec(&db)
            .await;
        if let Err(e) = result {
            warn!(video_id, error = %e, "Failed to count view");
        }
    });
}
