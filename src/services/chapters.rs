use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::{Chapter, NewChapterRequest, UpdateChapterRequest};
use crate::services::guard::{require_owned_course, required_text};
use crate::video::is_valid_asset_id;

async fn owned_chapter(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    chapter_id: &str,
) -> Result<Chapter, AppError> {
    require_owned_course(db, identity, course_id).await?;
    repository::find_chapter(db, course_id, chapter_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Takes the course off the storefront once its last published chapter is
/// gone.
async fn unpublish_course_if_empty(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
) -> Result<(), AppError> {
    if repository::count_published_chapters(db, course_id).await? == 0
        && repository::set_course_published(db, course_id, identity.user_id(), false).await?
    {
        info!("course {} unpublished, no published chapters left", course_id);
    }
    Ok(())
}

/// An asset id may belong to one chapter only, otherwise deleting one course
/// would remove another course's video. Blank clears the asset.
async fn checked_asset_id(
    db: &SqlitePool,
    chapter_id: &str,
    asset_id: String,
) -> Result<Option<String>, AppError> {
    let asset_id = asset_id.trim();
    if asset_id.is_empty() {
        return Ok(None);
    }
    if !is_valid_asset_id(asset_id) {
        return Err(AppError::BadRequest("Video asset id is invalid".to_string()));
    }
    if repository::video_asset_in_use(db, asset_id, chapter_id).await? {
        return Err(AppError::BadRequest("Video asset is already in use".to_string()));
    }
    Ok(Some(asset_id.to_string()))
}

/// Appends a new chapter after the current last position.
pub async fn create_chapter(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    req: NewChapterRequest,
) -> Result<Chapter, AppError> {
    require_owned_course(db, identity, course_id).await?;
    let title = required_text(req.title.as_deref(), "Title")?;

    let position = match repository::last_chapter_position(db, course_id).await? {
        None => 1,
        Some(last) => last.checked_add(1).ok_or_else(|| {
            AppError::BadRequest("No position left after the last chapter".to_string())
        })?,
    };
    let chapter = repository::insert_chapter(db, course_id, &title, position).await?;
    info!("chapter {} added to course {} at {}", chapter.id, course_id, position);
    Ok(chapter)
}

pub async fn update_chapter(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    chapter_id: &str,
    req: UpdateChapterRequest,
) -> Result<Chapter, AppError> {
    let mut current = owned_chapter(db, identity, course_id, chapter_id).await?;

    if let Some(title) = req.title {
        current.title = required_text(Some(&title), "Title")?;
    }
    if let Some(description) = req.description {
        current.description = Some(description).filter(|d| !d.trim().is_empty());
    }
    if let Some(video_url) = req.video_url {
        current.video_url = Some(video_url).filter(|u| !u.trim().is_empty());
    }
    if let Some(video_asset_id) = req.video_asset_id {
        current.video_asset_id = checked_asset_id(db, chapter_id, video_asset_id).await?;
    }
    if let Some(is_free) = req.is_free {
        current.is_free = is_free;
    }
    current.updated_at = Utc::now().to_rfc3339();

    if !repository::update_chapter(db, &current).await? {
        return Err(AppError::NotFound);
    }
    Ok(current)
}

pub async fn delete_chapter(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    chapter_id: &str,
) -> Result<Chapter, AppError> {
    let chapter = owned_chapter(db, identity, course_id, chapter_id).await?;

    if !repository::delete_chapter(db, course_id, chapter_id).await? {
        return Err(AppError::NotFound);
    }
    info!("chapter {} deleted from course {}", chapter_id, course_id);

    unpublish_course_if_empty(db, identity, course_id).await?;
    Ok(chapter)
}

fn is_chapter_publishable(chapter: &Chapter) -> bool {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    !chapter.title.trim().is_empty() && present(&chapter.description) && present(&chapter.video_url)
}

/// A chapter needs a title, a description and a video before it can go live.
pub async fn publish_chapter(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    chapter_id: &str,
) -> Result<Chapter, AppError> {
    let chapter = owned_chapter(db, identity, course_id, chapter_id).await?;

    if !is_chapter_publishable(&chapter) {
        return Err(AppError::MissingRequiredFields);
    }

    if !repository::set_chapter_published(db, course_id, chapter_id, true).await? {
        return Err(AppError::NotFound);
    }
    owned_chapter(db, identity, course_id, chapter_id).await
}

pub async fn unpublish_chapter(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    chapter_id: &str,
) -> Result<Chapter, AppError> {
    owned_chapter(db, identity, course_id, chapter_id).await?;

    if !repository::set_chapter_published(db, course_id, chapter_id, false).await? {
        return Err(AppError::NotFound);
    }

    unpublish_course_if_empty(db, identity, course_id).await?;
    owned_chapter(db, identity, course_id, chapter_id).await
}
