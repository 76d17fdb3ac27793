use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "banned_tag")]
pub struct Model {
    /// Normalized hashtag, e.g. `#spam`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
