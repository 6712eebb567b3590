use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::{Chapter, Course};
use crate::services::guard::require_owned_course;

/// Progress of a course towards being publishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub completed_count: usize,
    pub total_count: usize,
    pub is_complete: bool,
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

/// Required fields in display order: title, description, image, price,
/// category, and at least one published chapter.
fn required_fields(course: &Course, chapters: &[Chapter]) -> [bool; 6] {
    [
        !course.title.trim().is_empty(),
        has_text(&course.description),
        has_text(&course.image_url),
        course.price.is_some(),
        has_text(&course.category_id),
        chapters.iter().any(|chapter| chapter.is_published),
    ]
}

pub fn compute_completion(course: &Course, chapters: &[Chapter]) -> Completion {
    let fields = required_fields(course, chapters);
    let completed_count = fields.iter().filter(|present| **present).count();

    Completion {
        completed_count,
        total_count: fields.len(),
        is_complete: completed_count == fields.len(),
    }
}

pub fn is_publishable(course: &Course, chapters: &[Chapter]) -> bool {
    compute_completion(course, chapters).is_complete
}

/// Publishes the course if it is complete. Completeness is derived from the
/// stored course and chapters, never from the caller.
pub async fn publish_course(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
) -> Result<Course, AppError> {
    let course = require_owned_course(db, identity, course_id).await?;
    let chapters = repository::fetch_chapters(db, course_id).await?;

    if !is_publishable(&course, &chapters) {
        return Err(AppError::MissingRequiredFields);
    }

    if !repository::set_course_published(db, course_id, identity.user_id(), true).await? {
        return Err(AppError::Unauthorized);
    }
    info!("course {} published", course_id);

    require_owned_course(db, identity, course_id).await
}

pub async fn unpublish_course(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
) -> Result<Course, AppError> {
    require_owned_course(db, identity, course_id).await?;

    if !repository::set_course_published(db, course_id, identity.user_id(), false).await? {
        return Err(AppError::Unauthorized);
    }
    info!("course {} unpublished", course_id);

    require_owned_course(db, identity, course_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(title: &str) -> Course {
        Course {
            id: "course-1".to_string(),
            user_id: "owner".to_string(),
            title: title.to_string(),
            description: None,
            image_url: None,
            price: None,
            category_id: None,
            is_published: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn filled_course() -> Course {
        Course {
            description: Some("Learn the basics".to_string()),
            image_url: Some("https://host/cover.png".to_string()),
            price: Some(19.99),
            category_id: Some("cat-computer-science".to_string()),
            ..course("Intro")
        }
    }

    fn chapter(is_published: bool) -> Chapter {
        Chapter {
            id: "chapter-1".to_string(),
            course_id: "course-1".to_string(),
            title: "Welcome".to_string(),
            description: None,
            video_url: None,
            video_asset_id: None,
            position: 1,
            is_free: false,
            is_published,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_title_only_course_is_incomplete() {
        let completion = compute_completion(&course("Intro"), &[]);
        assert_eq!(completion.completed_count, 1);
        assert_eq!(completion.total_count, 6);
        assert!(!completion.is_complete);
    }

    #[test]
    fn test_filled_course_needs_published_chapter() {
        let draft_only = compute_completion(&filled_course(), &[chapter(false)]);
        assert_eq!(draft_only.completed_count, 5);
        assert!(!draft_only.is_complete);

        let published = compute_completion(&filled_course(), &[chapter(false), chapter(true)]);
        assert_eq!(published.completed_count, 6);
        assert!(published.is_complete);
    }

    #[test]
    fn test_blank_text_does_not_count() {
        let blank = Course {
            description: Some("   ".to_string()),
            ..filled_course()
        };
        assert!(!is_publishable(&blank, &[chapter(true)]));
    }

    #[test]
    fn test_zero_price_counts_as_set() {
        let free = Course {
            price: Some(0.0),
            ..filled_course()
        };
        assert!(is_publishable(&free, &[chapter(true)]));
    }

    #[tokio::test]
    async fn test_publish_incomplete_course_leaves_flag_unchanged() {
        let pool = crate::db::connect("sqlite::memory:").await.expect("db");
        let owner = Identity::new("owner");
        let created = repository::insert_course(&pool, "owner", "Intro")
            .await
            .expect("insert course");

        let result = publish_course(&pool, &owner, &created.id).await;
        assert!(matches!(result, Err(AppError::MissingRequiredFields)));

        let stored = repository::find_course_by_id(&pool, &created.id)
            .await
            .expect("query")
            .expect("course missing");
        assert!(!stored.is_published);
    }

    #[tokio::test]
    async fn test_publish_and_unpublish_complete_course() {
        let pool = crate::db::connect("sqlite::memory:").await.expect("db");
        let owner = Identity::new("owner");
        let created = repository::insert_course(&pool, "owner", "Intro")
            .await
            .expect("insert course");

        let filled = Course {
            id: created.id.clone(),
            ..filled_course()
        };
        repository::update_course(&pool, &filled).await.expect("update course");
        let chapter = repository::insert_chapter(&pool, &created.id, "Welcome", 1)
            .await
            .expect("insert chapter");
        repository::set_chapter_published(&pool, &created.id, &chapter.id, true)
            .await
            .expect("publish chapter");

        let published = publish_course(&pool, &owner, &created.id)
            .await
            .expect("publish should succeed");
        assert!(published.is_published);
        let stored = repository::find_course_by_id(&pool, &created.id)
            .await
            .expect("query")
            .expect("course missing");
        assert_eq!(published.updated_at, stored.updated_at);
        assert_ne!(published.updated_at, filled.updated_at);

        let intruder = publish_course(&pool, &Identity::new("intruder"), &created.id).await;
        assert!(matches!(intruder, Err(AppError::Unauthorized)));

        let unpublished = unpublish_course(&pool, &owner, &created.id)
            .await
            .expect("unpublish should succeed");
        assert!(!unpublished.is_published);
        let stored = repository::find_course_by_id(&pool, &created.id)
            .await
            .expect("query")
            .expect("course missing");
        assert_eq!(unpublished.updated_at, stored.updated_at);
    }
}
