use chrono::{DateTime, Utc};

use crate::engine::ProgressEngine;
use crate::store::operations::progress::{PracticeDay, UserProgress};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Folds one timestamped study event into the streak and per-day history.
/// Day boundaries are UTC calendar days.
fn fold_practice(
    progress: &mut UserProgress,
    words_studied: u32,
    correct_answers: u32,
    time_spent_secs: u64,
    now: DateTime<Utc>,
) {
    let today = now.date_naive();
    let last_day = progress.last_practice_at.date_naive();
    let day_gap = (today - last_day).num_days();

    if progress.current_streak == 0 {
        // First recorded practice for this user.
        progress.current_streak = 1;
    } else if day_gap == 1 {
        progress.current_streak += 1;
    } else if day_gap > 1 {
        progress.current_streak = 1;
    }
    progress.longest_streak = progress.longest_streak.max(progress.current_streak);
    progress.last_practice_at = now;

    match progress
        .practice_history
        .iter_mut()
        .find(|entry| entry.date == today)
    {
        Some(entry) => {
            entry.words_studied += words_studied;
            entry.correct_answers += correct_answers;
            entry.time_spent_secs += time_spent_secs;
        }
        None => progress.practice_history.push(PracticeDay {
            date: today,
            words_studied,
            correct_answers,
            time_spent_secs,
        }),
    }
}

impl ProgressEngine {
    /// Records a study event against the daily streak and practice history.
    ///
    /// Same-day events only accumulate into today's history entry; an event
    /// exactly one day after the last practice extends the streak; a longer
    /// gap resets it to 1.
    pub fn record_practice(
        &self,
        user_id: &str,
        words_studied: u32,
        correct_answers: u32,
        time_spent_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary, StoreError> {
        let init = self.initial_progress(user_id, now);
        let updated = self.store().update_user_progress(user_id, &init, |p| {
            fold_practice(p, words_studied, correct_answers, time_spent_secs, now)
        })?;

        Ok(StreakSummary {
            current_streak: updated.current_streak,
            longest_streak: updated.longest_streak,
        })
    }
}
