pub mod attachment;
pub mod category;
pub mod chapter;
pub mod course;

pub use attachment::{Attachment, NewAttachmentRequest};
pub use category::Category;
pub use chapter::{Chapter, NewChapterRequest, ReorderItem, ReorderRequest, UpdateChapterRequest};
pub use course::{
    BrowseCoursesQuery, Course, CourseSetup, NewCourseRequest, PublishedCourse,
    UpdateCourseRequest,
};
