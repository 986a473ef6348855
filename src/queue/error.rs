use super::fingerprint::Fingerprint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Queue is full: capacity={capacity}")]
    QueueFull { capacity: usize },

    #[error("Retry limit exceeded for item {fingerprint}: attempts={count}")]
    RetryLimitExceeded { fingerprint: Fingerprint, count: u32 },

    #[error("Unknown item: {0}")]
    UnknownItem(Fingerprint),

    #[error("Item cannot be fingerprinted: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Item cannot be fingerprinted: {0}")]
    InvalidItem(String),

    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
}

impl QueueError {
    /// Nothing buffered right now; not a failure for drain loops
    pub fn is_empty_error(&self) -> bool {
        matches!(self, QueueError::QueueEmpty)
    }

    /// Backpressure signal; the caller still owns the rejected item
    pub fn is_full(&self) -> bool {
        matches!(self, QueueError::QueueFull { .. })
    }

    /// The item spent its whole retry budget and should be dead-lettered
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, QueueError::RetryLimitExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
