pub const VOCABULARY_MASTERY: &str = "vocabulary_mastery";
pub const REVIEW_DUE_INDEX: &str = "review_due_index";
pub const USER_PROGRESS: &str = "user_progress";
pub const LESSON_PROGRESS: &str = "lesson_progress";
pub const META: &str = "meta";
