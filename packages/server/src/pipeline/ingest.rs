//! Synchronous half of an upload: spool, validate, store, insert, schedule.
//!
//! Everything that can reject the request runs before the blob is written,
//! and the row insert is the last step, so a rejected upload leaves nothing
//! behind in either store.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::Field;
use chrono::Utc;
use common::blob_keys::{content_type_for, original_key};
use common::storage::{BlobStore, BoxReader};
use sea_orm::*;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;
use worker::DerivationJob;

use super::queue::DerivationQueue;
use crate::entity::{banned_tag, category, video};
use crate::error::AppError;
use crate::models::auth::{Principal, Role};
use crate::models::shared::validate_title;
use crate::utils::tags::{join_tags, normalize_tags};

/// Uploaded file held on local disk until the request is accepted.
/// The file is removed when this value is dropped.
pub struct SpooledFile {
    path: PathBuf,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

impl SpooledFile {
    async fn spool(mut field: Field<'_>, dir: &Path, max_size: u64) -> Result<Self, AppError> {
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .filter(|ct| !ct.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(&filename));

        let mut spooled = Self {
            path: dir.join(format!("vidshare-upload-{}", Uuid::new_v4())),
            filename,
            content_type,
            size: 0,
        };

        let mut file = tokio::fs::File::create(&spooled.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create spool file: {e}")))?;

        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            size += chunk.len() as u64;
            if size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Spool file write failed: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Spool file flush failed: {e}")))?;

        spooled.size = size;
        Ok(spooled)
    }

    async fn reader(&self) -> Result<BoxReader, AppError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen spool file: {e}")))?;
        Ok(Box::new(file))
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        // Best effort.
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Parsed multipart upload form.
#[derive(Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub tags: Option<String>,
    pub category_id: Option<i32>,
    pub product_link: Option<String>,
    pub file: Option<SpooledFile>,
}

impl UploadForm {
    /// Read every field of `multipart`. The `file` part is spooled into
    /// `spool_dir`; unknown fields are ignored.
    pub async fn read(
        multipart: &mut Multipart,
        spool_dir: &Path,
        max_size: u64,
    ) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                form.file = Some(SpooledFile::spool(field, spool_dir, max_size).await?);
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;
            match name.as_str() {
                "title" => form.title = value,
                "description" => form.description = value,
                "tags" => form.tags = Some(value),
                "category_id" => form.category_id = parse_category_id(&value)?,
                "product_link" => form.product_link = Some(value),
                _ => {}
            }
        }

        Ok(form)
    }
}

fn parse_category_id(raw: &str) -> Result<Option<i32>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("category_id must be an integer, got '{raw}'")))
}

/// Normalize free-text tags and reject the whole set if any is banned.
pub async fn checked_tags<C: ConnectionTrait>(db: &C, raw: &str) -> Result<Vec<String>, AppError> {
    let tags = normalize_tags(raw);
    if tags.is_empty() {
        return Ok(tags);
    }

    let banned: Option<String> = banned_tag::Entity::find()
        .select_only()
        .column(banned_tag::Column::Tag)
        .filter(banned_tag::Column::Tag.is_in(tags.clone()))
        .into_tuple::<String>()
        .one(db)
        .await?;
    if let Some(tag) = banned {
        return Err(AppError::Validation(format!("Tag '{tag}' is not allowed")));
    }

    Ok(tags)
}

/// `Some(id)` only if the category exists; dangling ids are dropped.
pub async fn existing_category<C: ConnectionTrait>(
    db: &C,
    category_id: Option<i32>,
) -> Result<Option<i32>, AppError> {
    let Some(id) = category_id else {
        return Ok(None);
    };
    let exists = category::Entity::find_by_id(id).count(db).await? > 0;
    Ok(exists.then_some(id))
}

/// Trimmed product link, kept only when `role` may carry one.
pub fn product_link_for(role: Role, raw: Option<String>) -> Option<String> {
    if role != Role::Business {
        return None;
    }
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Store and register a new upload, then schedule its derivation.
///
/// Returns once the row is committed; derivation runs later on the queue.
pub async fn ingest(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    queue: &DerivationQueue,
    principal: Principal,
    form: UploadForm,
) -> Result<video::Model, AppError> {
    validate_title(&form.title)?;
    let file = match form.file {
        Some(file) if file.size > 0 => file,
        Some(_) => return Err(AppError::Validation("Video file is empty".into())),
        None => return Err(AppError::Validation("Video file is required".into())),
    };

    let tags = match form.tags.as_deref() {
        Some(raw) => checked_tags(db, raw).await?,
        None => Vec::new(),
    };
    let category_id = existing_category(db, form.category_id).await?;
    let product_link = product_link_for(principal.role, form.product_link);

    let now = Utc::now();
    let key = original_key(principal.user_id, now, &file.filename);
    let stored = store
        .put_stream(&key, file.reader().await?, &file.content_type)
        .await?;
    drop(file);

    let new_video = video::ActiveModel {
        user_id: Set(principal.user_id),
        title: Set(form.title.trim().to_string()),
        description: Set(form.description.trim().to_string()),
        tags: Set(join_tags(&tags)),
        product_link: Set(product_link),
        category_id: Set(category_id),
        original_key: Set(key.clone()),
        rendition_720p_key: Set(None),
        rendition_480p_key: Set(None),
        thumbnail_key: Set(None),
        thumbnail_static_key: Set(None),
        is_approved: Set(principal.is_admin()),
        views: Set(0),
        created_at: Set(now),
        ..Default::default()
    };
    let model = match new_video.insert(db).await {
        Ok(model) => model,
        Err(e) => {
            warn!(blob_key = %key, "Video row insert failed; stored original is orphaned");
            return Err(e.into());
        }
    };

    info!(
        video_id = model.id,
        blob_key = %key,
        size = stored,
        approved = model.is_approved,
        "Video uploaded"
    );

    queue.schedule(DerivationJob {
        video_id: model.id,
        original_key: key,
    });

    Ok(model)
}
