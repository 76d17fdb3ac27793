use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use worker::{DerivationError, DerivationSink, SinkOutcome};

use crate::entity::video;

/// Writes derived keys onto the `video` row, one statement per stage.
pub struct DbDerivationSink {
    db: DatabaseConnection,
}

impl DbDerivationSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn outcome(rows_affected: u64) -> SinkOutcome {
    if rows_affected == 0 {
        SinkOutcome::RowMissing
    } else {
        SinkOutcome::Updated
    }
}

#[async_trait]
impl DerivationSink for DbDerivationSink {
    async fn record_thumbnails(
        &self,
        video_id: i32,
        animated_key: &str,
        static_key: &str,
    ) -> worker::Result<SinkOutcome> {
        let res = video::Entity::update_many()
            .col_expr(video::Column::ThumbnailKey, Expr::value(animated_key))
            .col_expr(video::Column::ThumbnailStaticKey, Expr::value(static_key))
            .filter(video::Column::Id.eq(video_id))
            .exec(&self.db)
            .await
            .map_err(|e| DerivationError::Sink(e.to_string()))?;
        Ok(outcome(res.rows_affected))
    }

    async fn record_renditions(
        &self,
        video_id: i32,
        key_720p: &str,
        key_480p: &str,
    ) -> worker::Result<SinkOutcome> {
        let res = video::Entity::update_many()
            .col_expr(video::Column::Rendition720pKey, Expr::value(key_720p))
            .col_expr(video::Column::Rendition480pKey, Expr::value(key_480p))
            .filter(video::Column::Id.eq(video_id))
            .exec(&self.db)
            .await
            .map_err(|e| DerivationError::Sink(e.to_string()))?;
        Ok(outcome(res.rows_affected))
    }
}
