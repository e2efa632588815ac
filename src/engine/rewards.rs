use std::sync::PoisonError;

use chrono::{DateTime, Utc};

use crate::constants::{GEMS_PER_LEVEL, XP_CORRECT_ATTEMPT, XP_INCORRECT_ATTEMPT};
use crate::engine::quests::QuestKind;
use crate::engine::ProgressEngine;
use crate::store::StoreError;

/// Consolidated outcome of one practice attempt, for the presentation layer
/// to react to (streak counter, level-up toast, gem balance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub mastery_level: u8,
    pub current_streak: u32,
    pub xp_level: u32,
    pub leveled_up: bool,
    pub gems_earned: u64,
}

impl ProgressEngine {
    /// Applies one practice attempt across mastery, streak, quest, XP and gem
    /// state.
    ///
    /// The five sub-updates are independent writes with no rollback: if one
    /// fails, the earlier ones stay applied, so side effects are at-least-once
    /// per call. Submitting the same attempt twice double-counts by design;
    /// callers must not retry automatically after an ambiguous failure.
    /// Attempts from the same user are serialized against each other;
    /// different users proceed in parallel.
    pub fn submit_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
        vocabulary_id: &str,
        is_correct: bool,
        time_spent_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<AttemptResult, StoreError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mastery = self.record_attempt(user_id, lesson_id, vocabulary_id, is_correct, now)?;

        let correct_answers = if is_correct { 1 } else { 0 };
        let streak = self.record_practice(user_id, 1, correct_answers, time_spent_secs, now)?;

        self.advance_quest(user_id, QuestKind::Words, 1, now)?;

        let award = if is_correct {
            XP_CORRECT_ATTEMPT
        } else {
            XP_INCORRECT_ATTEMPT
        };
        let outcome = self.add_xp(user_id, award, now)?;

        let gems_earned = if outcome.leveled_up {
            u64::from(outcome.xp.level) * GEMS_PER_LEVEL
        } else {
            0
        };
        if gems_earned > 0 {
            self.add_gems(user_id, gems_earned, now)?;
        }

        tracing::debug!(
            user_id,
            lesson_id,
            vocabulary_id,
            is_correct,
            mastery_level = mastery.level,
            xp_level = outcome.xp.level,
            leveled_up = outcome.leveled_up,
            gems_earned,
            "Practice attempt submitted"
        );

        Ok(AttemptResult {
            mastery_level: mastery.level,
            current_streak: streak.current_streak,
            xp_level: outcome.xp.level,
            leveled_up: outcome.leveled_up,
            gems_earned,
        })
    }
}
