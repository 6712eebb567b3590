pub mod attachments;
pub mod chapters;
pub mod courses;
pub mod guard;
pub mod ordering;
pub mod publishing;

pub use publishing::Completion;
