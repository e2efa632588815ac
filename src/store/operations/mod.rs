pub mod lesson_progress;
pub mod mastery;
pub mod progress;
