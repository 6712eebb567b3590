use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::attachment::display_name;
use crate::models::{Attachment, NewAttachmentRequest};
use crate::services::guard::{require_owned_course, required_text};

pub async fn create_attachment(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    req: NewAttachmentRequest,
) -> Result<Attachment, AppError> {
    require_owned_course(db, identity, course_id).await?;
    let url = required_text(req.url.as_deref(), "Url")?;

    let attachment = repository::insert_attachment(db, course_id, &display_name(&url), &url).await?;
    info!("attachment {} added to course {}", attachment.id, course_id);
    Ok(attachment)
}

pub async fn delete_attachment(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    attachment_id: &str,
) -> Result<Attachment, AppError> {
    require_owned_course(db, identity, course_id).await?;

    let attachment = repository::find_attachment(db, course_id, attachment_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !repository::delete_attachment(db, course_id, attachment_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(attachment)
}
