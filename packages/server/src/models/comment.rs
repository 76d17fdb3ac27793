use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::entity::comment;
use crate::error::AppError;

pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "Great video!")]
    pub text: String,
}

pub fn validate_comment(text: &str) -> Result<(), AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment text is required".into()));
    }
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommentListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub video_id: i32,
    pub user_id: i32,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<comment::Model> for CommentResponse {
    fn from(m: comment::Model) -> Self {
        Self {
            id: m.id,
            video_id: m.video_id,
            user_id: m.user_id,
            text: m.text,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentListResponse {
    pub data: Vec<CommentResponse>,
    pub pagination: Pagination,
}
