use sea_orm::sea_query::{Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{banned_tag, comment, video};
use crate::utils::tags::normalize_tag;

/// Insert the configured banned tags, skipping ones already present.
///
/// Entries are normalized the same way upload tags are, so `Spam` and
/// `#spam` both ban `#spam`. Entries that normalize to nothing are ignored.
pub async fn seed_banned_tags(db: &DatabaseConnection, tags: &[String]) -> Result<u32, DbErr> {
    let mut inserted = 0u32;
    for tag in tags.iter().filter_map(|t| normalize_tag(t)) {
        let model = banned_tag::ActiveModel {
            tag: Set(tag),
            created_at: Set(chrono::Utc::now()),
        };

        let result = banned_tag::Entity::insert(model)
            .on_conflict(
                OnConflict::column(banned_tag::Column::Tag)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(0) | Err(DbErr::RecordNotInserted) => {}
            Ok(_) => inserted += 1,
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} new banned tags", inserted);
    }
    Ok(inserted)
}

/// Ensure required database indexes exist.
///
/// Schema sync only creates single-column indexes, so the composite ones
/// backing the listings are created here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Public and moderation listings: WHERE is_approved = ? ORDER BY created_at DESC
    let video_listing = Index::create()
        .if_not_exists()
        .name("idx_video_approved_created")
        .table(video::Entity)
        .col(video::Column::IsApproved)
        .col(video::Column::CreatedAt)
        .to_owned();

    // Comment pages: WHERE video_id = ? ORDER BY created_at DESC
    let comment_listing = Index::create()
        .if_not_exists()
        .name("idx_comment_video_created")
        .table(comment::Entity)
        .col(comment::Column::VideoId)
        .col(comment::Column::CreatedAt)
        .to_owned();

    create_index(db, "idx_video_approved_created", video_listing).await;
    create_index(db, "idx_comment_video_created", comment_listing).await;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    match db.execute_unprepared(&stmt.to_string(PostgresQueryBuilder)).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
