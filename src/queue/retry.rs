use super::buffer::BoundedBuffer;
use super::counter::AttemptCounterStore;
use super::error::{QueueError, Result};
use super::fingerprint::fingerprint;
use crate::config::QueueConfig;
use parking_lot::Mutex;
use serde::Serialize;

/// RetryLimitQueue is a bounded FIFO that caps how often the same content
/// may be enqueued
///
/// Every successful `put_nowait` counts as one attempt for the item's
/// fingerprint. Once an item reaches `max_retries` attempts, further puts of
/// equal content fail with `RetryLimitExceeded` and never reach the buffer.
///
/// All operations are non-blocking: they complete or fail immediately.
/// One mutex guards both the buffer and the counters, so every call is
/// atomic with respect to every other call.
pub struct RetryLimitQueue<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    buffer: BoundedBuffer<T>,
    counters: AttemptCounterStore,
}

impl<T: Serialize> RetryLimitQueue<T> {
    /// Create an empty queue
    ///
    /// `capacity: None` means the buffer is unbounded.
    pub fn new(max_retries: u32, capacity: Option<usize>) -> Result<Self> {
        if max_retries == 0 {
            return Err(QueueError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if capacity == Some(0) {
            return Err(QueueError::InvalidConfig(
                "capacity must be positive when set".to_string(),
            ));
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                buffer: BoundedBuffer::new(capacity),
                counters: AttemptCounterStore::new(max_retries),
            }),
        })
    }

    pub fn unbounded(max_retries: u32) -> Result<Self> {
        Self::new(max_retries, None)
    }

    pub fn from_config(config: &QueueConfig) -> Result<Self> {
        Self::new(config.max_retries, config.capacity)
    }

    /// Enqueue an item, counting one attempt against its content
    ///
    /// Check order:
    /// 1. Buffer at capacity → `QueueFull`, no counter touched
    /// 2. Attempt budget spent → `RetryLimitExceeded`, item dropped by the queue
    /// 3. Append to the tail
    pub fn put_nowait(&self, item: T) -> Result<()> {
        let mut inner = self.inner.lock();

        inner.buffer.ensure_room()?;

        let key = fingerprint(&item)?;
        inner.counters.record_attempt(&key)?;
        inner.buffer.push(item)
    }

    /// Remove and return the oldest buffered item
    pub fn get_nowait(&self) -> Result<T> {
        self.inner.lock().buffer.pop()
    }

    /// How many times content equal to `item` has been successfully enqueued
    pub fn item_retry_count(&self, item: &T) -> Result<u32> {
        let key = fingerprint(item)?;
        self.inner.lock().counters.get_count(&key)
    }
}

impl<T> RetryLimitQueue<T> {
    pub fn len(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().buffer.is_full()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.inner.lock().buffer.capacity()
    }

    pub fn max_retries(&self) -> u32 {
        self.inner.lock().counters.max_retries()
    }

    /// Distinct contents ever enqueued (counters are never evicted)
    pub fn tracked_items(&self) -> usize {
        self.inner.lock().counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::thread;

    fn hello() -> Value {
        json!({"hello": "world"})
    }

    #[test]
    fn test_put_and_get_item() {
        let queue = RetryLimitQueue::unbounded(3).unwrap();

        queue.put_nowait(hello()).unwrap();
        assert_eq!(queue.get_nowait().unwrap(), hello());
    }

    #[test]
    fn test_item_retry_count() {
        let max_retries = 5;
        let queue = RetryLimitQueue::unbounded(max_retries).unwrap();

        for i in 1..=max_retries {
            queue.put_nowait(hello()).unwrap();
            queue.get_nowait().unwrap();
            assert_eq!(queue.item_retry_count(&hello()).unwrap(), i);
        }
    }

    #[test]
    fn test_retry_limit_scenario() {
        let queue = RetryLimitQueue::unbounded(3).unwrap();

        for expected in 1..=3 {
            queue.put_nowait(hello()).unwrap();
            assert_eq!(queue.item_retry_count(&hello()).unwrap(), expected);
            queue.get_nowait().unwrap();
        }

        let err = queue.put_nowait(hello()).unwrap_err();
        assert!(matches!(err, QueueError::RetryLimitExceeded { count: 3, .. }));
        assert_eq!(queue.item_retry_count(&hello()).unwrap(), 3);

        // The rejected put never reached the buffer
        assert!(matches!(queue.get_nowait(), Err(QueueError::QueueEmpty)));
    }

    #[test]
    fn test_counts_survive_without_draining() {
        // Attempts count per put, even while earlier copies are still buffered
        let queue = RetryLimitQueue::unbounded(2).unwrap();

        queue.put_nowait(hello()).unwrap();
        queue.put_nowait(hello()).unwrap();
        assert!(queue.put_nowait(hello()).unwrap_err().is_retry_exhausted());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_signed_zero_shares_budget() {
        let queue = RetryLimitQueue::unbounded(1).unwrap();

        queue.put_nowait(json!({"amount": 0.0})).unwrap();

        let err = queue.put_nowait(json!({"amount": -0.0})).unwrap_err();
        assert!(err.is_retry_exhausted());
        assert_eq!(queue.item_retry_count(&json!({"amount": -0.0})).unwrap(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_non_finite_item_is_not_queued() {
        let queue: RetryLimitQueue<Option<f64>> = RetryLimitQueue::unbounded(1).unwrap();

        queue.put_nowait(None).unwrap();

        let err = queue.put_nowait(Some(f64::NAN)).unwrap_err();
        assert!(matches!(err, QueueError::InvalidItem(_)));
        assert!(queue.put_nowait(Some(f64::INFINITY)).is_err());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.tracked_items(), 1);
    }

    #[test]
    fn test_retry_empty_exception() {
        let queue = RetryLimitQueue::unbounded(1).unwrap();

        assert!(matches!(queue.get_nowait(), Err(QueueError::QueueEmpty)));

        for i in 0..3 {
            queue.put_nowait(i).unwrap();
        }
        for i in 0..3 {
            assert_eq!(queue.get_nowait().unwrap(), i);
        }

        assert!(queue.get_nowait().unwrap_err().is_empty_error());
    }

    #[test]
    fn test_retry_full_exception() {
        let queue = RetryLimitQueue::new(1, Some(3)).unwrap();

        queue.put_nowait("a").unwrap();
        queue.put_nowait("b").unwrap();
        queue.put_nowait("c").unwrap();

        let err = queue.put_nowait("d").unwrap_err();
        assert!(matches!(err, QueueError::QueueFull { capacity: 3 }));
        assert!(queue.is_full());

        // The rejected item spent none of its budget
        assert!(matches!(
            queue.item_retry_count(&"d"),
            Err(QueueError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_capacity_checked_before_retry_budget() {
        let queue = RetryLimitQueue::new(1, Some(1)).unwrap();

        queue.put_nowait("x").unwrap();
        // Full and exhausted at once: capacity wins
        assert!(queue.put_nowait("x").unwrap_err().is_full());

        queue.get_nowait().unwrap();
        assert!(queue.put_nowait("x").unwrap_err().is_retry_exhausted());
        assert_eq!(queue.item_retry_count(&"x").unwrap(), 1);
    }

    #[test]
    fn test_inexistent_item_exception() {
        let queue = RetryLimitQueue::unbounded(1).unwrap();
        queue.put_nowait(hello()).unwrap();

        let err = queue
            .item_retry_count(&json!({"hello": "worldz"}))
            .unwrap_err();
        assert!(matches!(err, QueueError::UnknownItem(_)));
    }

    #[test]
    fn test_fresh_queue() {
        let queue: RetryLimitQueue<Value> = RetryLimitQueue::unbounded(1).unwrap();

        assert!(queue.is_empty());
        assert!(matches!(queue.get_nowait(), Err(QueueError::QueueEmpty)));
        assert!(matches!(
            queue.item_retry_count(&json!({"x": 1})),
            Err(QueueError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_content_identity_not_reference() {
        let queue = RetryLimitQueue::unbounded(2).unwrap();

        queue.put_nowait(json!({"a": 1, "b": 2})).unwrap();
        queue.put_nowait(json!({"b": 2, "a": 1})).unwrap();

        assert_eq!(queue.item_retry_count(&json!({"a": 1, "b": 2})).unwrap(), 2);
        assert_eq!(queue.tracked_items(), 1);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            RetryLimitQueue::<Value>::new(0, None),
            Err(QueueError::InvalidConfig(_))
        ));
        assert!(matches!(
            RetryLimitQueue::<Value>::new(1, Some(0)),
            Err(QueueError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = QueueConfig {
            max_retries: 2,
            capacity: Some(4),
        };
        let queue: RetryLimitQueue<Value> = RetryLimitQueue::from_config(&config).unwrap();

        assert_eq!(queue.max_retries(), 2);
        assert_eq!(queue.capacity(), Some(4));
    }

    #[test]
    fn test_concurrent_puts_respect_ceiling() {
        let max_retries = 5;
        let queue = Arc::new(RetryLimitQueue::unbounded(max_retries).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    (0..10)
                        .filter(|_| queue.put_nowait(hello()).is_ok())
                        .count()
                })
            })
            .collect();

        let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(successes, max_retries as usize);
        assert_eq!(queue.len(), max_retries as usize);
        assert_eq!(queue.item_retry_count(&hello()).unwrap(), max_retries);
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let queue = Arc::new(RetryLimitQueue::new(1, Some(16)).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    (0..10)
                        .filter(|i| queue.put_nowait(worker * 100 + i).is_ok())
                        .count()
                })
            })
            .collect();

        let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(successes, 16);
        assert_eq!(queue.len(), 16);
        assert_eq!(queue.tracked_items(), 16);
    }
}
