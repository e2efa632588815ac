use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Per-lesson completion tracking. Callers resolve slugs to lesson ids before
/// touching this collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub user_id: String,
    pub lesson_id: String,
    pub percent: u8,
    pub completed: bool,
    pub last_accessed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Store {
    pub fn set_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StoreError> {
        let key = keys::lesson_progress_key(&progress.user_id, &progress.lesson_id)?;
        self.lesson_progress
            .insert(key.as_bytes(), Self::serialize(progress)?)?;
        Ok(())
    }

    pub fn get_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, StoreError> {
        let key = keys::lesson_progress_key(user_id, lesson_id)?;
        match self.lesson_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// All lesson progress for a user, keyed by lesson id.
    pub fn list_lesson_progress(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, LessonProgress>, StoreError> {
        let prefix = keys::lesson_progress_prefix(user_id)?;
        let mut by_lesson = BTreeMap::new();
        for item in self.lesson_progress.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let progress: LessonProgress = Self::deserialize(&value)?;
            by_lesson.insert(progress.lesson_id.clone(), progress);
        }
        Ok(by_lesson)
    }
}
