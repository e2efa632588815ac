use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::XP_LEVEL_THRESHOLDS;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Aggregate progress document, one per user. Lazily created on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub daily_goal: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_practice_at: DateTime<Utc>,
    pub practice_history: Vec<PracticeDay>,
    pub xp: XpState,
    pub league: LeagueState,
    pub gems: u64,
    pub daily_quests: DailyQuests,
}

/// One calendar day of practice, at most one entry per UTC day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeDay {
    pub date: NaiveDate,
    pub words_studied: u32,
    pub correct_answers: u32,
    pub time_spent_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpState {
    pub current: i64,
    pub level: u32,
    pub next_level_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    Bronze,
    Silver,
    Gold,
    Sapphire,
    Ruby,
    Emerald,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueState {
    pub name: League,
    pub rank: u32,
    pub division: u32,
    /// XP remaining after subtracting all fully consumed leagues.
    pub xp: i64,
    pub next_rank_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuests {
    pub completed_ids: BTreeSet<String>,
    pub last_reset_at: DateTime<Utc>,
    pub progress: QuestProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub words_learned: u64,
    pub time_spent_secs: u64,
    pub lessons_completed: u64,
}

impl UserProgress {
    pub fn new(user_id: &str, daily_goal: u32, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            daily_goal,
            current_streak: 0,
            longest_streak: 0,
            last_practice_at: now,
            practice_history: Vec::new(),
            xp: XpState {
                current: 0,
                level: 1,
                next_level_at: XP_LEVEL_THRESHOLDS[1],
            },
            league: LeagueState {
                name: League::Bronze,
                rank: 1,
                division: 1,
                xp: 0,
                next_rank_at: 50,
            },
            gems: 0,
            daily_quests: DailyQuests {
                completed_ids: BTreeSet::new(),
                last_reset_at: now,
                progress: QuestProgress::default(),
            },
        }
    }
}

impl Store {
    pub fn get_user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, StoreError> {
        let key = keys::user_progress_key(user_id)?;
        match self.user_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Reads the progress document, creating `init` if absent. Creation uses
    /// compare-and-swap so two concurrent first reads cannot both write.
    pub fn get_or_init_user_progress(
        &self,
        user_id: &str,
        init: &UserProgress,
    ) -> Result<UserProgress, StoreError> {
        if let Some(existing) = self.get_user_progress(user_id)? {
            return Ok(existing);
        }

        let key = keys::user_progress_key(user_id)?;
        let bytes = Self::serialize(init)?;
        let cas_result = self
            .user_progress
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(bytes))
            .map_err(StoreError::Sled)?;

        match cas_result {
            Ok(()) => Ok(init.clone()),
            // Lost the race; the other writer's document wins.
            Err(_) => self
                .get_user_progress(user_id)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "user_progress".to_string(),
                    key: user_id.to_string(),
                }),
        }
    }

    /// Atomic read-modify-write of the progress document. `mutate` may run
    /// more than once on transaction retry and must stay pure.
    pub fn update_user_progress<F>(
        &self,
        user_id: &str,
        init: &UserProgress,
        mutate: F,
    ) -> Result<UserProgress, StoreError>
    where
        F: Fn(&mut UserProgress),
    {
        let key = keys::user_progress_key(user_id)?;

        let updated = self
            .user_progress
            .transaction(|tx| {
                let mut progress: UserProgress = match tx.get(key.as_bytes())? {
                    Some(raw) => serde_json::from_slice(&raw).map_err(|error| {
                        sled::transaction::ConflictableTransactionError::Abort(
                            StoreError::Serialization(error),
                        )
                    })?,
                    None => init.clone(),
                };

                mutate(&mut progress);

                let bytes = serde_json::to_vec(&progress).map_err(|error| {
                    sled::transaction::ConflictableTransactionError::Abort(
                        StoreError::Serialization(error),
                    )
                })?;
                tx.insert(key.as_bytes(), bytes)?;

                Ok(progress)
            })
            .map_err(
                |error: sled::transaction::TransactionError<StoreError>| match error {
                    sled::transaction::TransactionError::Abort(store_error) => store_error,
                    sled::transaction::TransactionError::Storage(storage_error) => {
                        StoreError::Sled(storage_error)
                    }
                },
            )?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn lazy_init_creates_document_once() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let init = UserProgress::new("u1", 20, Utc::now());
        assert!(store.get_user_progress("u1").unwrap().is_none());

        let first = store.get_or_init_user_progress("u1", &init).unwrap();
        assert_eq!(first.daily_goal, 20);
        assert_eq!(first.current_streak, 0);

        let mut changed = init.clone();
        changed.daily_goal = 50;
        let second = store.get_or_init_user_progress("u1", &changed).unwrap();
        assert_eq!(second.daily_goal, 20);
    }

    #[test]
    fn update_applies_mutation_atomically() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-update").to_str().unwrap()).unwrap();

        let init = UserProgress::new("u1", 20, Utc::now());
        store
            .update_user_progress("u1", &init, |p| p.gems += 5)
            .unwrap();
        let updated = store
            .update_user_progress("u1", &init, |p| p.gems += 7)
            .unwrap();

        assert_eq!(updated.gems, 12);
        assert_eq!(store.get_user_progress("u1").unwrap().unwrap().gems, 12);
    }

    #[test]
    fn progress_document_roundtrips_camel_case() {
        let progress = UserProgress::new("u1", 20, Utc::now());
        let json = serde_json::to_value(&progress).unwrap();
        assert!(json.get("dailyGoal").is_some());
        assert!(json.get("practiceHistory").is_some());
        assert_eq!(json["league"]["name"], "bronze");
        assert!(json["dailyQuests"].get("lastResetAt").is_some());
    }
}
