//! Learning from explicit user corrections.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::db::{FeedbackRecord, FeedbackStore, MemoryFeedbackStore};

const FIRST_CORRECTION_CONFIDENCE: f64 = 0.9;
const REPEAT_CORRECTION_BONUS: f64 = 0.02;

/// Upserts the correction for `package_id`: the category is overwritten, the
/// feedback count grows by one and confidence rises with repeated corrections.
pub fn record_user_feedback(
    store: &dyn FeedbackStore,
    package_id: &str,
    corrected_category: &str,
    now_ms: i64,
) -> Result<FeedbackRecord> {
    let package_id = package_id.trim();
    let category = corrected_category.trim().to_lowercase();
    if package_id.is_empty() || category.is_empty() {
        bail!("feedback requires a package id and a category");
    }

    let previous_count = store
        .get(package_id)?
        .map(|record| record.feedback_count)
        .unwrap_or(0);
    let feedback_count = previous_count.saturating_add(1);

    let record = FeedbackRecord {
        package_id: package_id.to_string(),
        category,
        confidence: correction_confidence(feedback_count),
        feedback_count,
        updated_at_ms: now_ms,
    };
    store.upsert(&record)?;
    Ok(record)
}

fn correction_confidence(feedback_count: u32) -> f64 {
    let repeats = feedback_count.saturating_sub(1) as f64;
    (FIRST_CORRECTION_CONFIDENCE + repeats * REPEAT_CORRECTION_BONUS).min(1.0)
}

/// Serves reads from memory and writes through to a backing store, so the
/// classifier never waits on storage during intake.
pub struct CachedFeedbackStore {
    cache: MemoryFeedbackStore,
    backing: Arc<dyn FeedbackStore>,
}

impl CachedFeedbackStore {
    pub fn new(backing: Arc<dyn FeedbackStore>, preload: Vec<FeedbackRecord>) -> Self {
        Self {
            cache: MemoryFeedbackStore::with_records(preload),
            backing,
        }
    }
}

impl FeedbackStore for CachedFeedbackStore {
    fn get(&self, package_id: &str) -> Result<Option<FeedbackRecord>> {
        self.cache.get(package_id)
    }

    /// The cache is updated even when the backing write fails; the error is
    /// still returned so the caller can report it.
    fn upsert(&self, record: &FeedbackRecord) -> Result<()> {
        self.cache.upsert(record)?;
        self.backing.upsert(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct BrokenStore;

    impl FeedbackStore for BrokenStore {
        fn get(&self, _package_id: &str) -> Result<Option<FeedbackRecord>> {
            Err(anyhow!("disk gone"))
        }

        fn upsert(&self, _record: &FeedbackRecord) -> Result<()> {
            Err(anyhow!("disk gone"))
        }
    }

    #[test]
    fn first_correction_creates_record() {
        let store = MemoryFeedbackStore::new();
        let record = record_user_feedback(&store, "com.acme.reader", "News", 1_000).unwrap();

        assert_eq!(record.category, "news");
        assert_eq!(record.feedback_count, 1);
        assert_eq!(record.confidence, 0.9);
        assert_eq!(store.get("com.acme.reader").unwrap(), Some(record));
    }

    #[test]
    fn repeated_corrections_overwrite_and_count() {
        let store = MemoryFeedbackStore::new();
        record_user_feedback(&store, "com.acme.reader", "news", 1_000).unwrap();
        let record = record_user_feedback(&store, "com.acme.reader", "education", 2_000).unwrap();

        assert_eq!(record.category, "education");
        assert_eq!(record.feedback_count, 2);
        assert!((record.confidence - 0.92).abs() < 1e-9);
        assert_eq!(record.updated_at_ms, 2_000);
    }

    #[test]
    fn confidence_is_capped() {
        assert_eq!(correction_confidence(100), 1.0);
    }

    #[test]
    fn blank_input_is_rejected() {
        let store = MemoryFeedbackStore::new();
        assert!(record_user_feedback(&store, " ", "news", 0).is_err());
        assert!(record_user_feedback(&store, "com.acme", "", 0).is_err());
    }

    #[test]
    fn cache_keeps_value_when_backing_write_fails() {
        let store = CachedFeedbackStore::new(Arc::new(BrokenStore), Vec::new());
        let record = FeedbackRecord {
            package_id: "com.acme".into(),
            category: "games".into(),
            confidence: 0.9,
            feedback_count: 1,
            updated_at_ms: 0,
        };

        assert!(store.upsert(&record).is_err());
        assert_eq!(store.get("com.acme").unwrap(), Some(record));
    }
}
