use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::repository;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::Course;

/// Re-reads the course scoped to the caller. Call at the start of every
/// mutation; never authorize from a course fetched earlier.
///
/// A missing course and a course owned by someone else both come back as
/// `Unauthorized`.
pub async fn require_owned_course(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
) -> Result<Course, AppError> {
    repository::find_owned_course(db, course_id, identity.user_id())
        .await?
        .ok_or(AppError::Unauthorized)
}

pub fn require_teacher(config: &Config, identity: &Identity) -> Result<(), AppError> {
    if config.is_teacher(identity) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Trimmed value of a required text field, or `BadRequest` naming it.
pub fn required_text(value: Option<&str>, field: &str) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(AppError::BadRequest(format!("{} is required", field))),
    }
}
