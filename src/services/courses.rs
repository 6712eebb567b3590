use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::db::repository;
use crate::error::AppError;
use crate::identity::Identity;
use crate::models::{
    BrowseCoursesQuery, Category, Course, CourseSetup, NewCourseRequest, PublishedCourse,
    UpdateCourseRequest,
};
use crate::services::guard::{require_owned_course, require_teacher, required_text};
use crate::services::publishing::compute_completion;
use crate::video::VideoHost;

pub async fn list_categories(db: &SqlitePool) -> Result<Vec<Category>, AppError> {
    Ok(repository::fetch_categories(db).await?)
}

pub async fn create_course(
    db: &SqlitePool,
    config: &Config,
    identity: &Identity,
    req: NewCourseRequest,
) -> Result<Course, AppError> {
    require_teacher(config, identity)?;
    let title = required_text(req.title.as_deref(), "Title")?;

    let course = repository::insert_course(db, identity.user_id(), &title).await?;
    info!("course {} created by {}", course.id, identity.user_id());
    Ok(course)
}

pub async fn list_owned_courses(
    db: &SqlitePool,
    identity: &Identity,
) -> Result<Vec<Course>, AppError> {
    Ok(repository::fetch_courses_by_owner(db, identity.user_id()).await?)
}

pub async fn course_setup(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
) -> Result<CourseSetup, AppError> {
    let course = require_owned_course(db, identity, course_id).await?;
    let chapters = repository::fetch_chapters(db, course_id).await?;
    let attachments = repository::fetch_attachments(db, course_id).await?;
    let completion = compute_completion(&course, &chapters);

    Ok(CourseSetup {
        course,
        chapters,
        attachments,
        completion,
    })
}

/// Blank optional text clears the field.
fn optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub async fn update_course(
    db: &SqlitePool,
    identity: &Identity,
    course_id: &str,
    req: UpdateCourseRequest,
) -> Result<Course, AppError> {
    let mut current = require_owned_course(db, identity, course_id).await?;

    if let Some(title) = req.title {
        current.title = required_text(Some(&title), "Title")?;
    }
    if let Some(description) = req.description {
        current.description = optional_text(description);
    }
    if let Some(image_url) = req.image_url {
        current.image_url = optional_text(image_url);
    }
    match req.price {
        Some(Some(price)) if !price.is_finite() || price < 0.0 => {
            return Err(AppError::BadRequest("Price must be a non-negative number".to_string()));
        }
        Some(price) => current.price = price,
        None => {}
    }
    if let Some(category_id) = req.category_id {
        let category_id = optional_text(category_id);
        if let Some(id) = &category_id {
            if !repository::category_exists(db, id).await? {
                return Err(AppError::BadRequest("Category not found".to_string()));
            }
        }
        current.category_id = category_id;
    }
    current.updated_at = Utc::now().to_rfc3339();

    if !repository::update_course(db, &current).await? {
        return Err(AppError::Unauthorized);
    }
    Ok(current)
}

/// Deletes the course after asking the video host to drop every chapter's
/// asset. A video host failure leaves the course in place.
pub async fn delete_course(
    db: &SqlitePool,
    config: &Config,
    video: &dyn VideoHost,
    identity: &Identity,
    course_id: &str,
) -> Result<Course, AppError> {
    require_teacher(config, identity)?;
    let course = require_owned_course(db, identity, course_id).await?;

    let chapters = repository::fetch_chapters(db, course_id).await?;
    for asset_id in chapters.iter().filter_map(|c| c.video_asset_id.as_deref()) {
        video.delete_asset(asset_id).await?;
    }

    if !repository::delete_course(db, course_id, identity.user_id()).await? {
        return Err(AppError::Unauthorized);
    }
    info!("course {} deleted ({} chapters)", course_id, chapters.len());
    Ok(course)
}

pub async fn browse_published(
    db: &SqlitePool,
    query: BrowseCoursesQuery,
) -> Result<Vec<Course>, AppError> {
    let category_id = query.category_id.and_then(optional_text);
    let title = query.title.and_then(optional_text);

    Ok(repository::fetch_published_courses(db, category_id.as_deref(), title.as_deref()).await?)
}

pub async fn published_course(db: &SqlitePool, course_id: &str) -> Result<PublishedCourse, AppError> {
    let course = repository::find_course_by_id(db, course_id)
        .await?
        .filter(|course| course.is_published)
        .ok_or(AppError::NotFound)?;
    let chapters = repository::fetch_published_chapters(db, course_id).await?;

    Ok(PublishedCourse { course, chapters })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::models::{NewChapterRequest, UpdateChapterRequest};
    use crate::services::chapters;
    use crate::video::NoopVideoHost;

    #[derive(Default)]
    struct RecordingVideoHost {
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VideoHost for RecordingVideoHost {
        async fn delete_asset(&self, asset_id: &str) -> Result<(), AppError> {
            self.deleted.lock().expect("lock").push(asset_id.to_string());
            Ok(())
        }
    }

    struct FailingVideoHost;

    #[async_trait]
    impl VideoHost for FailingVideoHost {
        async fn delete_asset(&self, _asset_id: &str) -> Result<(), AppError> {
            Err(AppError::VideoHost("unreachable".to_string()))
        }
    }

    async fn setup() -> (SqlitePool, Config, Identity) {
        let pool = crate::db::connect("sqlite::memory:").await.expect("db");
        (pool, Config::default(), Identity::new("owner"))
    }

    fn title(value: &str) -> NewCourseRequest {
        NewCourseRequest {
            title: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_course_requires_title() {
        let (pool, config, owner) = setup().await;

        let missing = create_course(&pool, &config, &owner, NewCourseRequest::default()).await;
        match missing {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Title is required"),
            other => panic!("unexpected: {:?}", other),
        }

        let course = create_course(&pool, &config, &owner, title("Intro"))
            .await
            .expect("create course");
        assert_eq!(course.user_id, "owner");
        assert_eq!(course.title, "Intro");
    }

    #[tokio::test]
    async fn test_create_course_requires_teacher() {
        let (pool, _, owner) = setup().await;
        let config = Config {
            teacher_ids: vec!["someone_else".to_string()],
            ..Config::default()
        };

        let result = create_course(&pool, &config, &owner, title("Intro")).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_update_course_validates_fields() {
        let (pool, config, owner) = setup().await;
        let course = create_course(&pool, &config, &owner, title("Intro")).await.expect("create");

        let negative = UpdateCourseRequest {
            price: Some(Some(-1.0)),
            ..Default::default()
        };
        assert!(matches!(
            update_course(&pool, &owner, &course.id, negative).await,
            Err(AppError::BadRequest(_))
        ));

        let unknown_category = UpdateCourseRequest {
            category_id: Some("cat-nope".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_course(&pool, &owner, &course.id, unknown_category).await,
            Err(AppError::BadRequest(_))
        ));

        let blank_title = UpdateCourseRequest {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_course(&pool, &owner, &course.id, blank_title).await,
            Err(AppError::BadRequest(_))
        ));

        let valid = UpdateCourseRequest {
            description: Some("All about it".to_string()),
            price: Some(Some(0.0)),
            category_id: Some("cat-music".to_string()),
            ..Default::default()
        };
        let updated = update_course(&pool, &owner, &course.id, valid).await.expect("update");
        assert_eq!(updated.title, "Intro");
        assert_eq!(updated.description.as_deref(), Some("All about it"));
        assert_eq!(updated.price, Some(0.0));
        assert_eq!(updated.category_id.as_deref(), Some("cat-music"));

        let setup = course_setup(&pool, &owner, &course.id).await.expect("setup");
        assert_eq!(setup.course.description.as_deref(), Some("All about it"));
        assert_eq!(setup.completion.completed_count, 4);

        let cleared = UpdateCourseRequest {
            price: Some(None),
            ..Default::default()
        };
        let updated = update_course(&pool, &owner, &course.id, cleared).await.expect("update");
        assert_eq!(updated.price, None);
        assert_eq!(updated.category_id.as_deref(), Some("cat-music"));
    }

    #[tokio::test]
    async fn test_deleting_own_course_never_touches_foreign_asset() {
        let (pool, config, victim) = setup().await;
        let attacker = Identity::new("attacker");
        let victim_course = create_course(&pool, &config, &victim, title("Victim")).await.expect("create");
        let victim_chapter = repository::insert_chapter(&pool, &victim_course.id, "Lesson", 1)
            .await
            .expect("insert chapter");
        chapters::update_chapter(
            &pool,
            &victim,
            &victim_course.id,
            &victim_chapter.id,
            UpdateChapterRequest {
                video_asset_id: Some("victim-asset".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("attach asset");

        let attacker_course =
            create_course(&pool, &config, &attacker, title("Attacker")).await.expect("create");
        let attacker_chapter = repository::insert_chapter(&pool, &attacker_course.id, "Copy", 1)
            .await
            .expect("insert chapter");
        let copied = chapters::update_chapter(
            &pool,
            &attacker,
            &attacker_course.id,
            &attacker_chapter.id,
            UpdateChapterRequest {
                video_asset_id: Some("victim-asset".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(copied, Err(AppError::BadRequest(_))));

        let video = RecordingVideoHost::default();
        delete_course(&pool, &config, &video, &attacker, &attacker_course.id)
            .await
            .expect("delete course");
        assert!(video.deleted.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_view_setup() {
        let (pool, config, owner) = setup().await;
        let course = create_course(&pool, &config, &owner, title("Intro")).await.expect("create");
        let intruder = Identity::new("intruder");

        let update = UpdateCourseRequest {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_course(&pool, &intruder, &course.id, update).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            course_setup(&pool, &intruder, &course.id).await,
            Err(AppError::Unauthorized)
        ));

        let stored = course_setup(&pool, &owner, &course.id).await.expect("setup");
        assert_eq!(stored.course.title, "Intro");
    }

    #[tokio::test]
    async fn test_delete_course_cleans_up_video_assets() {
        let (pool, config, owner) = setup().await;
        let course = create_course(&pool, &config, &owner, title("Intro")).await.expect("create");
        let chapter = chapters::create_chapter(
            &pool,
            &owner,
            &course.id,
            NewChapterRequest {
                title: Some("Welcome".to_string()),
            },
        )
        .await
        .expect("create chapter");
        chapters::update_chapter(
            &pool,
            &owner,
            &course.id,
            &chapter.id,
            UpdateChapterRequest {
                video_asset_id: Some("asset-123".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update chapter");

        let video = RecordingVideoHost::default();
        let deleted = delete_course(&pool, &config, &video, &owner, &course.id)
            .await
            .expect("delete course");
        assert_eq!(deleted.id, course.id);
        assert_eq!(*video.deleted.lock().expect("lock"), vec!["asset-123".to_string()]);

        assert!(matches!(
            course_setup(&pool, &owner, &course.id).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_delete_course_keeps_course_when_video_host_fails() {
        let (pool, config, owner) = setup().await;
        let course = create_course(&pool, &config, &owner, title("Intro")).await.expect("create");
        let chapter = repository::insert_chapter(&pool, &course.id, "Welcome", 1)
            .await
            .expect("insert chapter");
        let mut with_asset = chapter.clone();
        with_asset.video_asset_id = Some("asset-1".to_string());
        repository::update_chapter(&pool, &with_asset).await.expect("update chapter");

        let result = delete_course(&pool, &config, &FailingVideoHost, &owner, &course.id).await;
        assert!(matches!(result, Err(AppError::VideoHost(_))));
        assert!(course_setup(&pool, &owner, &course.id).await.is_ok());

        let intruder = delete_course(
            &pool,
            &config,
            &NoopVideoHost,
            &Identity::new("intruder"),
            &course.id,
        )
        .await;
        assert!(matches!(intruder, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_published_course_hides_drafts() {
        let (pool, config, owner) = setup().await;
        let course = create_course(&pool, &config, &owner, title("Intro")).await.expect("create");

        assert!(matches!(
            published_course(&pool, &course.id).await,
            Err(AppError::NotFound)
        ));

        let draft = repository::insert_chapter(&pool, &course.id, "Draft", 1).await.expect("chapter");
        let live = repository::insert_chapter(&pool, &course.id, "Live", 2).await.expect("chapter");
        repository::set_chapter_published(&pool, &course.id, &live.id, true)
            .await
            .expect("publish chapter");
        repository::set_course_published(&pool, &course.id, "owner", true)
            .await
            .expect("publish course");

        let view = published_course(&pool, &course.id).await.expect("published view");
        let ids: Vec<&str> = view.chapters.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![live.id.as_str()]);
        assert_ne!(ids[0], draft.id);

        let browse = browse_published(
            &pool,
            BrowseCoursesQuery {
                category_id: Some(" ".to_string()),
                title: Some("intro".to_string()),
            },
        )
        .await
        .expect("browse");
        assert_eq!(browse.len(), 1);
    }
}
