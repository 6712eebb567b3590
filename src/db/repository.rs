use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Attachment, Category, Chapter, Course};

macro_rules! course_columns {
    () => {
        "id, user_id, title, description, image_url, price, category_id, is_published, created_at, updated_at"
    };
}

macro_rules! chapter_columns {
    () => {
        "id, course_id, title, description, video_url, video_asset_id, position, is_free, is_published, created_at, updated_at"
    };
}

pub async fn fetch_categories(db: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC")
        .fetch_all(db)
        .await
}

pub async fn category_exists(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?1")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub async fn insert_course(
    db: &SqlitePool,
    user_id: &str,
    title: &str,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, user_id, title, description, image_url, price, category_id,
            is_published, created_at, updated_at)
        VALUES (?1, ?2, ?3, NULL, NULL, NULL, NULL, 0, ?4, ?4)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(title)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Course {
        id,
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: None,
        image_url: None,
        price: None,
        category_id: None,
        is_published: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(concat!(
        "SELECT ",
        course_columns!(),
        " FROM courses WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Owner-scoped lookup. `None` covers both a missing course and a course
/// owned by someone else.
pub async fn find_owned_course(
    db: &SqlitePool,
    course_id: &str,
    user_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(concat!(
        "SELECT ",
        course_columns!(),
        " FROM courses WHERE id = ?1 AND user_id = ?2"
    ))
    .bind(course_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_courses_by_owner(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(concat!(
        "SELECT ",
        course_columns!(),
        " FROM courses WHERE user_id = ?1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Makes `%`, `_` and `\` match literally in a `LIKE ... ESCAPE` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn fetch_published_courses(
    db: &SqlitePool,
    category_id: Option<&str>,
    title: Option<&str>,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(concat!(
        "SELECT ",
        course_columns!(),
        r#"
        FROM courses
        WHERE is_published = 1
          AND (?1 IS NULL OR category_id = ?1)
          AND (?2 IS NULL OR title LIKE '%' || ?2 || '%' ESCAPE '\')
        ORDER BY created_at DESC
        "#
    ))
    .bind(category_id)
    .bind(title.map(escape_like))
    .fetch_all(db)
    .await
}

/// Writes every scalar field of `course`, scoped to its owner.
pub async fn update_course(db: &SqlitePool, course: &Course) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = ?1,
            description = ?2,
            image_url = ?3,
            price = ?4,
            category_id = ?5,
            updated_at = ?6
        WHERE id = ?7 AND user_id = ?8
        "#,
    )
    .bind(&course.title)
    .bind(&course.description)
    .bind(&course.image_url)
    .bind(course.price)
    .bind(&course.category_id)
    .bind(&course.updated_at)
    .bind(&course.id)
    .bind(&course.user_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn set_course_published(
    db: &SqlitePool,
    course_id: &str,
    user_id: &str,
    is_published: bool,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET is_published = ?1,
            updated_at = ?2
        WHERE id = ?3 AND user_id = ?4
        "#,
    )
    .bind(is_published)
    .bind(now)
    .bind(course_id)
    .bind(user_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

/// Chapters and attachments go with it through the foreign key cascade.
pub async fn delete_course(
    db: &SqlitePool,
    course_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?1 AND user_id = ?2")
        .bind(course_id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_chapters(db: &SqlitePool, course_id: &str) -> Result<Vec<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(concat!(
        "SELECT ",
        chapter_columns!(),
        " FROM chapters WHERE course_id = ?1 ORDER BY position ASC, created_at ASC"
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_published_chapters(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(concat!(
        "SELECT ",
        chapter_columns!(),
        " FROM chapters WHERE course_id = ?1 AND is_published = 1 ORDER BY position ASC, created_at ASC"
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn find_chapter(
    db: &SqlitePool,
    course_id: &str,
    chapter_id: &str,
) -> Result<Option<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(concat!(
        "SELECT ",
        chapter_columns!(),
        " FROM chapters WHERE id = ?1 AND course_id = ?2"
    ))
    .bind(chapter_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

/// Highest position in the course, `None` when it has no chapters.
pub async fn last_chapter_position(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(position) FROM chapters WHERE course_id = ?1")
        .bind(course_id)
        .fetch_one(db)
        .await
}

/// Whether a chapter other than `chapter_id` already carries the asset.
pub async fn video_asset_in_use(
    db: &SqlitePool,
    asset_id: &str,
    chapter_id: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE video_asset_id = ?1 AND id != ?2")
            .bind(asset_id)
            .bind(chapter_id)
            .fetch_one(db)
            .await?;
    Ok(count > 0)
}

pub async fn insert_chapter(
    db: &SqlitePool,
    course_id: &str,
    title: &str,
    position: i64,
) -> Result<Chapter, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO chapters
            (id, course_id, title, description, video_url, video_asset_id,
            position, is_free, is_published, created_at, updated_at)
        VALUES (?1, ?2, ?3, NULL, NULL, NULL, ?4, 0, 0, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(course_id)
    .bind(title)
    .bind(position)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Chapter {
        id,
        course_id: course_id.to_string(),
        title: title.to_string(),
        description: None,
        video_url: None,
        video_asset_id: None,
        position,
        is_free: false,
        is_published: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Writes the editable fields of `chapter`. Position and publication have
/// their own statements.
pub async fn update_chapter(db: &SqlitePool, chapter: &Chapter) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE chapters
        SET title = ?1,
            description = ?2,
            video_url = ?3,
            video_asset_id = ?4,
            is_free = ?5,
            updated_at = ?6
        WHERE id = ?7 AND course_id = ?8
        "#,
    )
    .bind(&chapter.title)
    .bind(&chapter.description)
    .bind(&chapter.video_url)
    .bind(&chapter.video_asset_id)
    .bind(chapter.is_free)
    .bind(&chapter.updated_at)
    .bind(&chapter.id)
    .bind(&chapter.course_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn update_chapter_position(
    db: &SqlitePool,
    course_id: &str,
    chapter_id: &str,
    position: i64,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE chapters
        SET position = ?1,
            updated_at = ?2
        WHERE id = ?3 AND course_id = ?4
        "#,
    )
    .bind(position)
    .bind(now)
    .bind(chapter_id)
    .bind(course_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn set_chapter_published(
    db: &SqlitePool,
    course_id: &str,
    chapter_id: &str,
    is_published: bool,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE chapters
        SET is_published = ?1,
            updated_at = ?2
        WHERE id = ?3 AND course_id = ?4
        "#,
    )
    .bind(is_published)
    .bind(now)
    .bind(chapter_id)
    .bind(course_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn count_published_chapters(db: &SqlitePool, course_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE course_id = ?1 AND is_published = 1")
        .bind(course_id)
        .fetch_one(db)
        .await
}

pub async fn delete_chapter(
    db: &SqlitePool,
    course_id: &str,
    chapter_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chapters WHERE id = ?1 AND course_id = ?2")
        .bind(chapter_id)
        .bind(course_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn insert_attachment(
    db: &SqlitePool,
    course_id: &str,
    name: &str,
    url: &str,
) -> Result<Attachment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO attachments (id, course_id, name, url, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(course_id)
    .bind(name)
    .bind(url)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Attachment {
        id,
        course_id: course_id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        created_at: now,
    })
}

pub async fn fetch_attachments(
    db: &SqlitePool,
    course_id: &str,
) -> Result<Vec<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(
        "SELECT id, course_id, name, url, created_at FROM attachments WHERE course_id = ?1 ORDER BY created_at DESC",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn find_attachment(
    db: &SqlitePool,
    course_id: &str,
    attachment_id: &str,
) -> Result<Option<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(
        "SELECT id, course_id, name, url, created_at FROM attachments WHERE id = ?1 AND course_id = ?2",
    )
    .bind(attachment_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn delete_attachment(
    db: &SqlitePool,
    course_id: &str,
    attachment_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attachments WHERE id = ?1 AND course_id = ?2")
        .bind(attachment_id)
        .bind(course_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
