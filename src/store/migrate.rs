use crate::store::keys;
use crate::store::operations::mastery::VocabularyMasteryRecord;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "schema:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_review_due_index", m002_review_due_index),
    ]
}

/// Runs all unapplied migrations. Each migration must be idempotent: a crash
/// between the migration body and the version bump re-runs it on next start.
/// The version is persisted after every successful step and never moves
/// backwards.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().unwrap_or([0; 4]);
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rebuilds the review due index from the mastery records.
fn m002_review_due_index(store: &Store) -> Result<(), StoreError> {
    for item in store.vocabulary_mastery.iter() {
        let (_, value) = item?;
        let record: VocabularyMasteryRecord = Store::deserialize(&value)?;

        let due_index_key = keys::review_due_key(
            &record.user_id,
            record.next_review_at.timestamp_millis(),
            &record.lesson_id,
            &record.vocabulary_id,
        )?;
        store.review_due_index.insert(due_index_key.as_bytes(), &[])?;
    }

    Ok(())
}
