use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub user_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Normalized hashtags separated by single spaces.
    #[sea_orm(column_type = "Text")]
    pub tags: String,
    pub product_link: Option<String>,
    /// Weak reference; nulled when the category is deleted.
    #[sea_orm(indexed)]
    pub category_id: Option<i32>,

    pub original_key: String,
    pub rendition_720p_key: Option<String>,
    pub rendition_480p_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub thumbnail_static_key: Option<String>,

    #[sea_orm(indexed)]
    pub is_approved: bool,
    pub views: i64,
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
