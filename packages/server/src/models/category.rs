use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_name};
use crate::entity::category;
use crate::error::AppError;

pub const DEFAULT_CHILDREN_LIMIT: u64 = 500;
pub const MAX_CHILDREN_LIMIT: u64 = 2000;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    #[schema(example = "Music")]
    pub name: String,
    /// Parent category; omit to create a root.
    pub parent_id: Option<i32>,
}

pub fn validate_create_category(req: &CreateCategoryRequest) -> Result<(), AppError> {
    validate_name(&req.name)
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RenameCategoryRequest {
    #[schema(example = "Live Music")]
    pub name: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MoveCategoryRequest {
    /// New parent. `null` or absent promotes the category to a root.
    #[serde(default)]
    pub parent_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct ReorderCategoryRequest {
    /// Sibling to insert before. `null` or absent moves to the end.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub before_id: Option<Option<i32>>,
}

impl ReorderCategoryRequest {
    pub fn before(&self) -> Option<i32> {
        self.before_id.flatten()
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChildrenQuery {
    /// Parent whose children to list; omit for root categories.
    pub parent_id: Option<i32>,
    /// Maximum number of children (default 500, capped at 2000).
    pub limit: Option<u64>,
}

impl ChildrenQuery {
    pub fn effective_limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_CHILDREN_LIMIT)
            .clamp(1, MAX_CHILDREN_LIMIT)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(m: category::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            parent_id: m.parent_id,
            position: m.position,
            created_at: m.created_at,
        }
    }
}

/// Entry of the full tree listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryTreeItem {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub position: i32,
    /// 1 for roots.
    #[schema(example = 2)]
    pub depth: u32,
    #[schema(example = "Music / Jazz")]
    pub path: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryChildItem {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub position: i32,
    pub child_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryCountsResponse {
    pub child_count: u64,
    /// All nodes below the category, excluding itself.
    pub descendant_count: u64,
    pub video_count: u64,
}
