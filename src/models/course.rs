use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use super::{Attachment, Chapter};
use crate::services::publishing::Completion;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<String>,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Omitted leaves the price alone, `null` clears it.
    #[serde(default, deserialize_with = "present_or_null")]
    pub price: Option<Option<f64>>,
    pub category_id: Option<String>,
}

/// Distinguishes an explicit `null` from an omitted field, which serde's
/// `Option` collapses.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseCoursesQuery {
    pub category_id: Option<String>,
    pub title: Option<String>,
}

/// Everything the course setup page needs in one response.
#[derive(Debug, Clone, Serialize)]
pub struct CourseSetup {
    pub course: Course,
    pub chapters: Vec<Chapter>,
    pub attachments: Vec<Attachment>,
    pub completion: Completion,
}

/// Learner-facing view: only published chapters are included.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedCourse {
    pub course: Course,
    pub chapters: Vec<Chapter>,
}
