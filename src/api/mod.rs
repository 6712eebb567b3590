use axum::Json;
use axum::extract::{FromRequest, Path, Query};
use axum::routing::{patch, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::identity::Identity;
use crate::models::*;
use crate::services::{attachments, chapters, courses, ordering, publishing};
use crate::state::AppState;

/// JSON body whose decoding failures surface as `BadRequest`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
struct AppJson<T>(T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/categories", get(list_categories))
        .route("/courses", get(browse_courses).post(create_course))
        .route(
            "/courses/{course_id}",
            get(published_course).patch(update_course).delete(delete_course),
        )
        .route("/courses/{course_id}/publish", patch(publish_course))
        .route("/courses/{course_id}/unpublish", patch(unpublish_course))
        .route("/courses/{course_id}/attachments", post(create_attachment))
        .route(
            "/courses/{course_id}/attachments/{attachment_id}",
            axum::routing::delete(delete_attachment),
        )
        .route("/courses/{course_id}/chapters", post(create_chapter))
        .route("/courses/{course_id}/chapters/reorder", put(reorder_chapters))
        .route(
            "/courses/{course_id}/chapters/{chapter_id}",
            patch(update_chapter).delete(delete_chapter),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/publish",
            patch(publish_chapter),
        )
        .route(
            "/courses/{course_id}/chapters/{chapter_id}/unpublish",
            patch(unpublish_chapter),
        )
        .route("/teacher/courses", get(list_owned_courses))
        .route("/teacher/courses/{course_id}", get(course_setup))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    let categories = courses::list_categories(&state.db).await?;
    Ok(Json(categories))
}

async fn browse_courses(
    State(state): State<AppState>,
    Query(query): Query<BrowseCoursesQuery>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = courses::browse_published(&state.db, query).await?;
    Ok(Json(courses))
}

async fn published_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<PublishedCourse>, AppError> {
    let course = courses::published_course(&state.db, &course_id).await?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(req): AppJson<NewCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = courses::create_course(&state.db, &state.config, &identity, req).await?;
    Ok(Json(course))
}

async fn list_owned_courses(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = courses::list_owned_courses(&state.db, &identity).await?;
    Ok(Json(courses))
}

async fn course_setup(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
) -> Result<Json<CourseSetup>, AppError> {
    let setup = courses::course_setup(&state.db, &identity, &course_id).await?;
    Ok(Json(setup))
}

async fn update_course(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> Result<Json<Course>, AppError> {
    let course = courses::update_course(&state.db, &identity, &course_id, req).await?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = courses::delete_course(
        &state.db,
        &state.config,
        state.video.as_ref(),
        &identity,
        &course_id,
    )
    .await?;
    Ok(Json(course))
}

async fn publish_course(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = publishing::publish_course(&state.db, &identity, &course_id).await?;
    Ok(Json(course))
}

async fn unpublish_course(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = publishing::unpublish_course(&state.db, &identity, &course_id).await?;
    Ok(Json(course))
}

async fn create_attachment(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<NewAttachmentRequest>,
) -> Result<Json<Attachment>, AppError> {
    let attachment = attachments::create_attachment(&state.db, &identity, &course_id, req).await?;
    Ok(Json(attachment))
}

async fn delete_attachment(
    State(state): State<AppState>,
    identity: Identity,
    Path((course_id, attachment_id)): Path<(String, String)>,
) -> Result<Json<Attachment>, AppError> {
    let attachment =
        attachments::delete_attachment(&state.db, &identity, &course_id, &attachment_id).await?;
    Ok(Json(attachment))
}

async fn create_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<NewChapterRequest>,
) -> Result<Json<Chapter>, AppError> {
    let chapter = chapters::create_chapter(&state.db, &identity, &course_id, req).await?;
    Ok(Json(chapter))
}

async fn reorder_chapters(
    State(state): State<AppState>,
    identity: Identity,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<ReorderRequest>,
) -> Result<StatusCode, AppError> {
    let list = req
        .list
        .ok_or_else(|| AppError::BadRequest("List is required".to_string()))?;
    ordering::reorder_chapters(&state.db, &identity, &course_id, &list).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path((course_id, chapter_id)): Path<(String, String)>,
    AppJson(req): AppJson<UpdateChapterRequest>,
) -> Result<Json<Chapter>, AppError> {
    let chapter =
        chapters::update_chapter(&state.db, &identity, &course_id, &chapter_id, req).await?;
    Ok(Json(chapter))
}

async fn delete_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path((course_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<Chapter>, AppError> {
    let chapter = chapters::delete_chapter(&state.db, &identity, &course_id, &chapter_id).await?;
    Ok(Json(chapter))
}

async fn publish_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path((course_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<Chapter>, AppError> {
    let chapter = chapters::publish_chapter(&state.db, &identity, &course_id, &chapter_id).await?;
    Ok(Json(chapter))
}

async fn unpublish_chapter(
    State(state): State<AppState>,
    identity: Identity,
    Path((course_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<Chapter>, AppError> {
    let chapter =
        chapters::unpublish_chapter(&state.db, &identity, &course_id, &chapter_id).await?;
    Ok(Json(chapter))
}
