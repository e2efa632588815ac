use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::engine::ProgressEngine;
use crate::store::operations::progress::{DailyQuests, QuestProgress};
use crate::store::StoreError;

/// The three daily quest counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestKind {
    Words,
    Time,
    Lessons,
}

impl FromStr for QuestKind {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "words" => Ok(Self::Words),
            "time" => Ok(Self::Time),
            "lessons" => Ok(Self::Lessons),
            other => Err(StoreError::Validation(format!(
                "unknown quest type: {other}"
            ))),
        }
    }
}

impl ProgressEngine {
    /// Advances one daily quest counter.
    ///
    /// When the calendar date has changed since the last reset, the call only
    /// performs the reset (clears completions, zeroes counters) and `amount`
    /// is not applied; the next call lands on the fresh counters. This mirrors
    /// the reference behavior.
    pub fn advance_quest(
        &self,
        user_id: &str,
        kind: QuestKind,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress, StoreError> {
        let init = self.initial_progress(user_id, now);
        let before = self.store().get_or_init_user_progress(user_id, &init)?;
        let resetting = now.date_naive() != before.daily_quests.last_reset_at.date_naive();

        let updated = self.store().update_user_progress(user_id, &init, |p| {
            if reset_if_new_day(&mut p.daily_quests, now) {
                return;
            }
            match kind {
                QuestKind::Words => p.daily_quests.progress.words_learned += amount,
                QuestKind::Time => p.daily_quests.progress.time_spent_secs += amount,
                QuestKind::Lessons => p.daily_quests.progress.lessons_completed += amount,
            }
        })?;

        if resetting {
            tracing::debug!(user_id, "Daily quests reset");
        }

        Ok(updated.daily_quests.progress)
    }

    /// Marks a quest completed for today. Completion detection itself belongs
    /// to the quest catalog; this only records its verdict. Idempotent.
    pub fn record_quest_completion(
        &self,
        user_id: &str,
        quest_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DailyQuests, StoreError> {
        if quest_id.is_empty() {
            return Err(StoreError::Validation(
                "questId must not be empty".to_string(),
            ));
        }

        let init = self.initial_progress(user_id, now);
        let updated = self.store().update_user_progress(user_id, &init, |p| {
            reset_if_new_day(&mut p.daily_quests, now);
            p.daily_quests.completed_ids.insert(quest_id.to_string());
        })?;

        Ok(updated.daily_quests)
    }
}

/// Clears quest state when `now` falls on a different UTC date than the last
/// reset. Returns true when a reset happened.
fn reset_if_new_day(quests: &mut DailyQuests, now: DateTime<Utc>) -> bool {
    if now.date_naive() == quests.last_reset_at.date_naive() {
        return false;
    }
    quests.completed_ids.clear();
    quests.progress = QuestProgress::default();
    quests.last_reset_at = now;
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::store::Store;

    fn open_engine(name: &str) -> (tempfile::TempDir, ProgressEngine) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join(name).to_str().unwrap()).unwrap();
        (dir, ProgressEngine::new(Arc::new(store)))
    }

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn counters_advance_by_kind() {
        let (_dir, engine) = open_engine("db-kinds");
        let now = noon(2024, 3, 1);

        engine.user_progress("u1", now).unwrap();
        engine.advance_quest("u1", QuestKind::Words, 3, now).unwrap();
        engine.advance_quest("u1", QuestKind::Time, 120, now).unwrap();
        let progress = engine
            .advance_quest("u1", QuestKind::Lessons, 1, now)
            .unwrap();

        assert_eq!(progress.words_learned, 3);
        assert_eq!(progress.time_spent_secs, 120);
        assert_eq!(progress.lessons_completed, 1);
    }

    #[test]
    fn new_day_reset_consumes_the_call() {
        let (_dir, engine) = open_engine("db-reset");
        let day_one = noon(2024, 3, 1);
        let day_two = noon(2024, 3, 2);

        engine.user_progress("u1", day_one).unwrap();
        engine.advance_quest("u1", QuestKind::Words, 5, day_one).unwrap();
        engine
            .record_quest_completion("u1", "daily-words", day_one)
            .unwrap();

        // The first call on the new day only resets; its amount is dropped.
        let after_reset = engine
            .advance_quest("u1", QuestKind::Words, 4, day_two)
            .unwrap();
        assert_eq!(after_reset, QuestProgress::default());

        let quests = engine.user_progress("u1", day_two).unwrap().daily_quests;
        assert!(quests.completed_ids.is_empty());
        assert_eq!(quests.last_reset_at, day_two);

        let next = engine
            .advance_quest("u1", QuestKind::Words, 4, day_two + Duration::hours(1))
            .unwrap();
        assert_eq!(next.words_learned, 4);
    }

    #[test]
    fn completion_recording_is_idempotent() {
        let (_dir, engine) = open_engine("db-complete");
        let now = noon(2024, 3, 1);

        engine.user_progress("u1", now).unwrap();
        engine
            .record_quest_completion("u1", "daily-words", now)
            .unwrap();
        let quests = engine
            .record_quest_completion("u1", "daily-words", now)
            .unwrap();

        assert_eq!(quests.completed_ids.len(), 1);
        assert!(quests.completed_ids.contains("daily-words"));
    }

    #[test]
    fn quest_kind_parses_known_names_only() {
        assert_eq!("words".parse::<QuestKind>().unwrap(), QuestKind::Words);
        assert_eq!("time".parse::<QuestKind>().unwrap(), QuestKind::Time);
        assert_eq!("lessons".parse::<QuestKind>().unwrap(), QuestKind::Lessons);
        assert!(matches!(
            "streaks".parse::<QuestKind>(),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn empty_quest_id_is_rejected() {
        let (_dir, engine) = open_engine("db-empty-quest");
        let err = engine
            .record_quest_completion("u1", "", noon(2024, 3, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
