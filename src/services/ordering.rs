use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::repository;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::ReorderItem;
use crate::services::guard::require_owned_course;

/// Applies each `(id, position)` pair to the matching chapter of the course,
/// one statement per pair, in order.
///
/// A pair naming a chapter outside the course matches nothing and is skipped.
/// Positions are written as given: no uniqueness or contiguity check. A store
/// error stops the batch; pairs already applied stay applied.
pub async fn reorder_chapters(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    items: &[ReorderItem],
) -> Result<usize, AppError> {
    require_owned_course(db, identity, course_id).await?;

    let mut applied = 0;
    for item in items {
        if repository::update_chapter_position(db, course_id, &item.id, item.position).await? {
            applied += 1;
        } else {
            debug!("reorder skipped chapter {} not in course {}", item.id, course_id);
        }
    }

    info!(
        "reordered course {}: {} of {} chapters updated",
        course_id,
        applied,
        items.len()
    );
    Ok(applied)
}
