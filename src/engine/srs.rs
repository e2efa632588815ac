use chrono::{DateTime, Duration, Utc};

use crate::constants::SRS_INTERVAL_DAYS;
use crate::engine::ProgressEngine;
use crate::store::operations::mastery::VocabularyMasteryRecord;
use crate::store::StoreError;

/// Correct answers move up one level, incorrect ones move down one, clamped to
/// the interval table bounds.
pub(crate) fn next_level(level: u8, is_correct: bool) -> u8 {
    let max_level = (SRS_INTERVAL_DAYS.len() - 1) as u8;
    if is_correct {
        level.saturating_add(1).min(max_level)
    } else {
        level.saturating_sub(1)
    }
}

pub(crate) fn review_interval(level: u8) -> Duration {
    let index = (level as usize).min(SRS_INTERVAL_DAYS.len() - 1);
    Duration::days(SRS_INTERVAL_DAYS[index])
}

impl ProgressEngine {
    /// Applies one practice attempt to the item's spaced-repetition state and
    /// returns the updated record.
    ///
    /// The very first correct attempt for an item starts at level 1, not 0;
    /// the first incorrect attempt starts at level 0.
    pub fn record_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
        vocabulary_id: &str,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<VocabularyMasteryRecord, StoreError> {
        let record = match self.store().get_mastery(user_id, lesson_id, vocabulary_id)? {
            Some(mut existing) => {
                existing.level = next_level(existing.level, is_correct);
                if is_correct {
                    existing.correct_count += 1;
                } else {
                    existing.incorrect_count += 1;
                }
                existing.last_practiced_at = now;
                existing.next_review_at = now + review_interval(existing.level);
                existing
            }
            None => {
                let level = if is_correct { 1 } else { 0 };
                VocabularyMasteryRecord {
                    user_id: user_id.to_string(),
                    lesson_id: lesson_id.to_string(),
                    vocabulary_id: vocabulary_id.to_string(),
                    level,
                    correct_count: if is_correct { 1 } else { 0 },
                    incorrect_count: if is_correct { 0 } else { 1 },
                    last_practiced_at: now,
                    next_review_at: now + review_interval(level),
                }
            }
        };

        self.store().set_mastery(&record)?;
        tracing::debug!(
            user_id,
            lesson_id,
            vocabulary_id,
            level = record.level,
            is_correct,
            "Recorded practice attempt"
        );
        Ok(record)
    }

    /// Mastery records for one lesson, for review screens and statistics.
    pub fn lesson_mastery(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Vec<VocabularyMasteryRecord>, StoreError> {
        self.store().lesson_mastery(user_id, lesson_id)
    }

    /// Items whose next review date has passed, earliest first.
    pub fn due_reviews(
        &self,
        user_id: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<VocabularyMasteryRecord>, StoreError> {
        self.store().due_reviews(user_id, limit, now)
    }
}
