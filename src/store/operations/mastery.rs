use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;
use std::collections::HashSet;

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Per-(user, lesson, vocabulary item) spaced-repetition state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyMasteryRecord {
    pub user_id: String,
    pub lesson_id: String,
    pub vocabulary_id: String,
    pub level: u8,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub last_practiced_at: DateTime<Utc>,
    pub next_review_at: DateTime<Utc>,
}

fn due_index_key_for(record: &VocabularyMasteryRecord) -> Result<String, StoreError> {
    keys::review_due_key(
        &record.user_id,
        record.next_review_at.timestamp_millis(),
        &record.lesson_id,
        &record.vocabulary_id,
    )
}

impl Store {
    pub fn get_mastery(
        &self,
        user_id: &str,
        lesson_id: &str,
        vocabulary_id: &str,
    ) -> Result<Option<VocabularyMasteryRecord>, StoreError> {
        let key = keys::mastery_key(user_id, lesson_id, vocabulary_id)?;
        match self.vocabulary_mastery.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Writes a mastery record and keeps the review due index in step with it
    /// inside a single transaction.
    pub fn set_mastery(&self, record: &VocabularyMasteryRecord) -> Result<(), StoreError> {
        let key = keys::mastery_key(&record.user_id, &record.lesson_id, &record.vocabulary_id)?;
        let value = Self::serialize(record)?;
        let next_due_index_key = due_index_key_for(record)?;

        (&self.vocabulary_mastery, &self.review_due_index)
            .transaction(|(tx_mastery, tx_due_index)| {
                if let Some(old_raw) = tx_mastery.get(key.as_bytes())? {
                    let old_record: VocabularyMasteryRecord = serde_json::from_slice(&old_raw)
                        .map_err(|error| {
                            sled::transaction::ConflictableTransactionError::Abort(
                                StoreError::Serialization(error),
                            )
                        })?;
                    let old_due_index_key = due_index_key_for(&old_record)
                        .map_err(sled::transaction::ConflictableTransactionError::Abort)?;
                    tx_due_index.remove(old_due_index_key.as_bytes())?;
                }

                tx_mastery.insert(key.as_bytes(), value.as_slice())?;
                tx_due_index.insert(next_due_index_key.as_bytes(), &[])?;

                Ok(())
            })
            .map_err(
                |error: sled::transaction::TransactionError<StoreError>| match error {
                    sled::transaction::TransactionError::Abort(store_error) => store_error,
                    sled::transaction::TransactionError::Storage(storage_error) => {
                        StoreError::Sled(storage_error)
                    }
                },
            )?;

        Ok(())
    }

    /// All mastery records for one user within one lesson.
    pub fn lesson_mastery(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Vec<VocabularyMasteryRecord>, StoreError> {
        let prefix = keys::mastery_lesson_prefix(user_id, lesson_id)?;
        let mut records = Vec::new();
        for item in self.vocabulary_mastery.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            records.push(Self::deserialize::<VocabularyMasteryRecord>(&value)?);
        }
        Ok(records)
    }

    /// Mastery records due for review at `now`, earliest first.
    pub fn due_reviews(
        &self,
        user_id: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<VocabularyMasteryRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = keys::review_due_prefix(user_id)?;
        let now_ms = now.timestamp_millis().max(0);
        let mut due = Vec::with_capacity(limit);
        let mut seen_items = HashSet::new();

        for item in self.review_due_index.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let Some((due_ts_ms, lesson_id, vocabulary_id)) = keys::parse_review_due_key(&key)
            else {
                continue;
            };

            if due_ts_ms > now_ms {
                break;
            }

            if let Some(record) = self.get_mastery(user_id, &lesson_id, &vocabulary_id)? {
                let record_due_ts_ms = record.next_review_at.timestamp_millis().max(0);
                if record_due_ts_ms == due_ts_ms
                    && record_due_ts_ms <= now_ms
                    && seen_items.insert((lesson_id, vocabulary_id))
                {
                    due.push(record);
                    if due.len() >= limit {
                        break;
                    }
                }
            }
        }

        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    use super::VocabularyMasteryRecord;
    use crate::store::Store;

    fn mock_record(user_id: &str, lesson_id: &str, vocabulary_id: &str) -> VocabularyMasteryRecord {
        let now = Utc::now();
        VocabularyMasteryRecord {
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            vocabulary_id: vocabulary_id.to_string(),
            level: 1,
            correct_count: 1,
            incorrect_count: 0,
            last_practiced_at: now,
            next_review_at: now + Duration::days(3),
        }
    }

    #[test]
    fn set_and_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();

        let record = mock_record("u1", "l1", "v1");
        store.set_mastery(&record).unwrap();

        let got = store.get_mastery("u1", "l1", "v1").unwrap().unwrap();
        assert_eq!(got.level, 1);
        assert_eq!(got.correct_count, 1);
    }

    #[test]
    fn lesson_mastery_is_scoped_to_lesson() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-lesson").to_str().unwrap()).unwrap();

        store.set_mastery(&mock_record("u1", "l1", "v1")).unwrap();
        store.set_mastery(&mock_record("u1", "l1", "v2")).unwrap();
        store.set_mastery(&mock_record("u1", "l2", "v1")).unwrap();
        store.set_mastery(&mock_record("u2", "l1", "v1")).unwrap();

        let records = store.lesson_mastery("u1", "l1").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.lesson_id == "l1"));
    }

    #[test]
    fn due_reviews_returns_earliest_first_and_respects_limit() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-due").to_str().unwrap()).unwrap();

        let now = Utc::now();
        let mut r1 = mock_record("u1", "l1", "v1");
        r1.next_review_at = now - Duration::minutes(5);
        let mut r2 = mock_record("u1", "l1", "v2");
        r2.next_review_at = now - Duration::minutes(1);
        let mut r3 = mock_record("u1", "l1", "v3");
        r3.next_review_at = now - Duration::minutes(3);
        let mut r4 = mock_record("u1", "l1", "v4");
        r4.next_review_at = now + Duration::minutes(1);

        store.set_mastery(&r1).unwrap();
        store.set_mastery(&r2).unwrap();
        store.set_mastery(&r3).unwrap();
        store.set_mastery(&r4).unwrap();

        let due = store.due_reviews("u1", 2, now).unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].vocabulary_id, "v1");
        assert_eq!(due[1].vocabulary_id, "v3");
    }

    #[test]
    fn due_index_tracks_latest_review_date() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db-due-update").to_str().unwrap()).unwrap();

        let now = Utc::now();
        let mut record = mock_record("u1", "l1", "v1");
        record.next_review_at = now - Duration::minutes(5);
        store.set_mastery(&record).unwrap();

        record.next_review_at = now + Duration::days(3);
        store.set_mastery(&record).unwrap();

        assert!(store.due_reviews("u1", 10, now).unwrap().is_empty());
    }
}
