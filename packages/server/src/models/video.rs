use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engagement::EngagementSummary;
use super::shared::{Pagination, double_option};
use crate::entity::video;
use crate::error::AppError;
use crate::utils::tags::split_stored;

/// Query parameters for the public video list.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VideoListQuery {
    /// Page number (1-based). Default: 1.
    pub page: Option<u64>,
    /// Items per page (1-100). Default: 20.
    pub per_page: Option<u64>,
    /// Case-insensitive match against title, description or tags.
    pub search: Option<String>,
    /// Only videos attached to this category.
    pub category_id: Option<i32>,
    /// Comma or space separated tags; a video matches if it carries any of them.
    pub tags: Option<String>,
}

/// Rendition served by the content endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Original,
    P720,
    P480,
}

impl Quality {
    /// Unknown values select the original.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("720p") => Quality::P720,
            Some("480p") => Quality::P480,
            _ => Quality::Original,
        }
    }

    /// Stored key for this quality, falling back to the original when the
    /// rendition has not been derived.
    pub fn select_key(self, video: &video::Model) -> &str {
        let rendition = match self {
            Quality::Original => None,
            Quality::P720 => video.rendition_720p_key.as_deref(),
            Quality::P480 => video.rendition_480p_key.as_deref(),
        };
        rendition.unwrap_or(&video.original_key)
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContentQuery {
    /// `720p` or `480p`; anything else streams the original.
    pub quality: Option<String>,
}

/// Preview form served by the thumbnail endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailVariant {
    Animated,
    Static,
}

impl ThumbnailVariant {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            None | Some("animated") => Ok(ThumbnailVariant::Animated),
            Some("static") => Ok(ThumbnailVariant::Static),
            Some(other) => Err(AppError::Validation(format!(
                "variant must be 'animated' or 'static', got '{other}'"
            ))),
        }
    }

    /// Requested form first, the other one as fallback.
    pub fn select_key(self, video: &video::Model) -> Option<&str> {
        let animated = video.thumbnail_key.as_deref();
        let still = video.thumbnail_static_key.as_deref();
        match self {
            ThumbnailVariant::Animated => animated.or(still),
            ThumbnailVariant::Static => still.or(animated),
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThumbnailQuery {
    /// `animated` (default) or `static`.
    pub variant: Option<String>,
}

/// Partial update of video metadata. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Free text, normalized like upload tags.
    pub tags: Option<String>,
    /// `null` detaches the video from its category.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    /// Kept only for business and admin editors.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub product_link: Option<Option<String>>,
}

/// Response to a successful upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadVideoResponse {
    pub id: i32,
    /// `pending` until a moderator approves; `approved` for admin uploads.
    #[schema(example = "pending")]
    pub status: &'static str,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoListItem {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: Option<i32>,
    pub has_thumbnail: bool,
    pub is_approved: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl From<video::Model> for VideoListItem {
    fn from(m: video::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            title: m.title,
            description: m.description,
            tags: split_stored(&m.tags),
            category_id: m.category_id,
            has_thumbnail: m.thumbnail_key.is_some() || m.thumbnail_static_key.is_some(),
            is_approved: m.is_approved,
            views: m.views,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoListResponse {
    pub data: Vec<VideoListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoDetailResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub product_link: Option<String>,
    pub category_id: Option<i32>,
    /// Qualities the content endpoint can serve right now.
    #[schema(example = json!(["original", "720p", "480p"]))]
    pub qualities: Vec<&'static str>,
    pub has_thumbnail: bool,
    pub is_approved: bool,
    pub views: i64,
    pub comment_count: u64,
    pub engagement: EngagementSummary,
    pub created_at: DateTime<Utc>,
}

impl VideoDetailResponse {
    pub fn new(m: video::Model, comment_count: u64, engagement: EngagementSummary) -> Self {
        let mut qualities = vec!["original"];
        if m.rendition_720p_key.is_some() {
            qualities.push("720p");
        }
        if m.rendition_480p_key.is_some() {
            qualities.push("480p");
        }
        Self {
            id: m.id,
            user_id: m.user_id,
            tags: split_stored(&m.tags),
            has_thumbnail: m.thumbnail_key.is_some() || m.thumbnail_static_key.is_some(),
            title: m.title,
            description: m.description,
            product_link: m.product_link,
            category_id: m.category_id,
            qualities,
            is_approved: m.is_approved,
            views: m.views,
            comment_count,
            engagement,
            created_at: m.created_at,
        }
    }
}
