use super::error::{QueueError, Result};
use super::fingerprint::Fingerprint;
use std::collections::HashMap;

/// Per-fingerprint attempt accounting with a hard ceiling
///
/// Counters are created on the first successful attempt and are never reset
/// or evicted, so the map grows by one entry per distinct item ever seen.
///
/// The store is plain data. `RetryLimitQueue` keeps it behind the same lock
/// as its buffer so that counting and buffering stay atomic together.
#[derive(Debug)]
pub struct AttemptCounterStore {
    counts: HashMap<Fingerprint, u32>,
    max_retries: u32,
}

impl AttemptCounterStore {
    pub fn new(max_retries: u32) -> Self {
        Self {
            counts: HashMap::new(),
            max_retries,
        }
    }

    /// Count one more attempt and return the new total
    ///
    /// Fails without touching the counter when the total would exceed
    /// `max_retries`.
    pub fn record_attempt(&mut self, fingerprint: &Fingerprint) -> Result<u32> {
        let current = self.counts.get(fingerprint).copied().unwrap_or(0);

        if current >= self.max_retries {
            return Err(QueueError::RetryLimitExceeded {
                fingerprint: fingerprint.clone(),
                count: current,
            });
        }

        let next = current + 1;
        self.counts.insert(fingerprint.clone(), next);
        Ok(next)
    }

    pub fn get_count(&self, fingerprint: &Fingerprint) -> Result<u32> {
        self.counts
            .get(fingerprint)
            .copied()
            .ok_or_else(|| QueueError::UnknownItem(fingerprint.clone()))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Number of distinct fingerprints ever recorded
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::fingerprint::fingerprint;
    use serde_json::json;

    fn fp(name: &str) -> Fingerprint {
        fingerprint(&json!({ "name": name })).unwrap()
    }

    #[test]
    fn test_record_attempt_counts_up() {
        let mut store = AttemptCounterStore::new(3);
        let key = fp("a");

        assert_eq!(store.record_attempt(&key).unwrap(), 1);
        assert_eq!(store.record_attempt(&key).unwrap(), 2);
        assert_eq!(store.get_count(&key).unwrap(), 2);
    }

    #[test]
    fn test_ceiling_leaves_counter_unchanged() {
        let mut store = AttemptCounterStore::new(2);
        let key = fp("a");

        store.record_attempt(&key).unwrap();
        store.record_attempt(&key).unwrap();

        let err = store.record_attempt(&key).unwrap_err();
        match err {
            QueueError::RetryLimitExceeded { fingerprint, count } => {
                assert_eq!(fingerprint, key);
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // A second rejection reports the same capped value
        assert!(store.record_attempt(&key).unwrap_err().is_retry_exhausted());
        assert_eq!(store.get_count(&key).unwrap(), 2);
    }

    #[test]
    fn test_counters_are_independent() {
        let mut store = AttemptCounterStore::new(1);

        store.record_attempt(&fp("a")).unwrap();
        store.record_attempt(&fp("b")).unwrap();

        assert!(store.record_attempt(&fp("a")).is_err());
        assert_eq!(store.get_count(&fp("b")).unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unknown_fingerprint() {
        let store = AttemptCounterStore::new(1);

        assert!(store.is_empty());
        assert!(matches!(
            store.get_count(&fp("missing")),
            Err(QueueError::UnknownItem(_))
        ));
    }
}
