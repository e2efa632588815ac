pub mod quests;
pub mod rewards;
pub mod srs;
pub mod streak;
pub mod xp;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_DAILY_GOAL, MAX_LESSON_PERCENT};
use crate::store::operations::lesson_progress::LessonProgress;
use crate::store::operations::progress::UserProgress;
use crate::store::{Store, StoreError};

/// Progress and spaced-repetition tracking engine.
///
/// All mutating operations take an explicit `now` so day-boundary and interval
/// logic is deterministic; day boundaries are UTC calendar days. The engine
/// holds no per-request state beyond the store handle and a per-user lock map
/// that serializes attempts from the same user.
pub struct ProgressEngine {
    store: Arc<Store>,
    default_daily_goal: u32,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProgressEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_daily_goal(store, DEFAULT_DAILY_GOAL)
    }

    pub fn with_daily_goal(store: Arc<Store>, default_daily_goal: u32) -> Self {
        Self {
            store,
            default_daily_goal,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub(crate) fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Periodically prune entries that are no longer held by anyone.
        // Arc::strong_count == 1 means only the HashMap holds a reference,
        // so the lock is idle and can be safely removed.
        if locks.len() > 1000 {
            locks.retain(|_, v| Arc::strong_count(v) > 1);
        }

        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) fn initial_progress(&self, user_id: &str, now: DateTime<Utc>) -> UserProgress {
        UserProgress::new(user_id, self.default_daily_goal, now)
    }

    /// Current progress document, created with defaults on first read.
    pub fn user_progress(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserProgress, StoreError> {
        let init = self.initial_progress(user_id, now);
        self.store.get_or_init_user_progress(user_id, &init)
    }

    pub fn set_daily_goal(
        &self,
        user_id: &str,
        goal: u32,
        now: DateTime<Utc>,
    ) -> Result<UserProgress, StoreError> {
        if goal == 0 {
            return Err(StoreError::Validation(
                "dailyGoal must be at least 1".to_string(),
            ));
        }
        let init = self.initial_progress(user_id, now);
        self.store
            .update_user_progress(user_id, &init, |p| p.daily_goal = goal)
    }

    /// Adds gems to the user's balance and returns the new total. Spending is
    /// outside this engine; balances only grow here.
    pub fn add_gems(
        &self,
        user_id: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let init = self.initial_progress(user_id, now);
        let updated = self
            .store
            .update_user_progress(user_id, &init, |p| p.gems += amount)?;
        Ok(updated.gems)
    }

    /// Records lesson completion percent; 100 marks the lesson completed.
    pub fn record_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
        percent: u8,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StoreError> {
        if percent > MAX_LESSON_PERCENT {
            return Err(StoreError::Validation(format!(
                "lesson percent {percent} exceeds {MAX_LESSON_PERCENT}"
            )));
        }

        let completed = percent == MAX_LESSON_PERCENT;
        let completed_at = if completed {
            self.store
                .get_lesson_progress(user_id, lesson_id)?
                .and_then(|existing| existing.completed_at)
                .or(Some(now))
        } else {
            None
        };

        let progress = LessonProgress {
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            percent,
            completed,
            last_accessed_at: now,
            completed_at,
        };
        self.store.set_lesson_progress(&progress)?;
        Ok(progress)
    }

    pub fn lesson_progress_map(
        &self,
        user_id: &str,
    ) -> Result<std::collections::BTreeMap<String, LessonProgress>, StoreError> {
        self.store.list_lesson_progress(user_id)
    }
}
