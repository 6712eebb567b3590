use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: String,
    pub course_id: String,
    pub name: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAttachmentRequest {
    pub url: Option<String>,
}

/// Display name of an attachment: the last path segment of its url.
///
/// Query strings and fragments are not part of the name. A url ending in a
/// slash falls back to the whole url.
pub fn display_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_is_last_path_segment() {
        assert_eq!(display_name("https://host/files/notes.pdf"), "notes.pdf");
        assert_eq!(display_name("notes.pdf"), "notes.pdf");
    }

    #[test]
    fn test_display_name_ignores_query_and_fragment() {
        assert_eq!(
            display_name("https://utfs.io/f/abc/slides.key?download=1#top"),
            "slides.key"
        );
    }

    #[test]
    fn test_display_name_trailing_slash_keeps_url() {
        assert_eq!(display_name("https://host/files/"), "https://host/files/");
    }
}
