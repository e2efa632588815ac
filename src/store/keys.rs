use crate::store::StoreError;

/// Keys are colon-joined, so ids must be non-empty and colon-free.
fn require_id(field: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    if value.contains(':') {
        return Err(StoreError::Validation(format!(
            "{field} must not contain ':'"
        )));
    }
    Ok(())
}

pub fn user_progress_key(user_id: &str) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    Ok(user_id.to_string())
}

pub fn mastery_key(
    user_id: &str,
    lesson_id: &str,
    vocabulary_id: &str,
) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    require_id("lessonId", lesson_id)?;
    require_id("vocabularyId", vocabulary_id)?;
    Ok(format!("{}:{}:{}", user_id, lesson_id, vocabulary_id))
}

pub fn mastery_lesson_prefix(user_id: &str, lesson_id: &str) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    require_id("lessonId", lesson_id)?;
    Ok(format!("{}:{}:", user_id, lesson_id))
}

pub fn review_due_key(
    user_id: &str,
    due_ts_ms: i64,
    lesson_id: &str,
    vocabulary_id: &str,
) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    require_id("lessonId", lesson_id)?;
    require_id("vocabularyId", vocabulary_id)?;
    let ts = due_ts_ms.max(0) as u64;
    Ok(format!("{}:{:020}:{}:{}", user_id, ts, lesson_id, vocabulary_id))
}

pub fn review_due_prefix(user_id: &str) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    Ok(format!("{}:", user_id))
}

/// Parses `(due_ts_ms, lesson_id, vocabulary_id)` out of a due-index key.
pub fn parse_review_due_key(raw: &[u8]) -> Option<(i64, String, String)> {
    let text = std::str::from_utf8(raw).ok()?;
    let mut parts = text.splitn(4, ':');
    let _user_id = parts.next()?;
    let due_ts_ms = parts.next()?.parse::<u64>().ok()?;
    let lesson_id = parts.next()?;
    let vocabulary_id = parts.next()?;
    Some((
        due_ts_ms.min(i64::MAX as u64) as i64,
        lesson_id.to_string(),
        vocabulary_id.to_string(),
    ))
}

pub fn lesson_progress_key(user_id: &str, lesson_id: &str) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    require_id("lessonId", lesson_id)?;
    Ok(format!("{}:{}", user_id, lesson_id))
}

pub fn lesson_progress_prefix(user_id: &str) -> Result<String, StoreError> {
    require_id("userId", user_id)?;
    Ok(format!("{}:", user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_keys_order_ascending_by_time() {
        let early = review_due_key("u1", 1000, "l1", "v1").unwrap();
        let late = review_due_key("u1", 2000, "l1", "v1").unwrap();
        assert!(early < late);
    }

    #[test]
    fn due_key_roundtrips_through_parse() {
        let key = review_due_key("u1", 1234, "l1", "v9").unwrap();
        let (ts, lesson, vocab) = parse_review_due_key(key.as_bytes()).unwrap();
        assert_eq!(ts, 1234);
        assert_eq!(lesson, "l1");
        assert_eq!(vocab, "v9");
    }

    #[test]
    fn empty_ids_are_rejected() {
        let err = mastery_key("", "l1", "v1").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn ids_with_separator_are_rejected() {
        let err = mastery_key("u1", "l:1", "v1").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
