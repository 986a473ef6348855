//! Retrying batch writes
//!
//! Batch-write APIs accept a bounded batch and hand back the items they did
//! not process (throttling, partial failure). `write_all` pushes every input
//! item through a `RetryLimitQueue`, drains it in batches, and re-enqueues
//! whatever comes back unprocessed. Content that exhausts its retry budget
//! is dead-lettered instead of being retried forever.

use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::{QueueError, RetryLimitQueue};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest batch the table write API accepts
pub const DEFAULT_BATCH_SIZE: usize = 25;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{items} items exceed the write queue capacity of {capacity}")]
    Backpressure { items: usize, capacity: usize },

    #[error("Batch writer failed: {0}")]
    Writer(String),

    #[error("Retry queue error: {0}")]
    Queue(#[from] QueueError),
}

pub type Result<T> = std::result::Result<T, BatchError>;

/// Destination for batched writes
#[async_trait]
pub trait BatchWriter<T: Send + 'static>: Send + Sync {
    /// Write one batch and return the items that were NOT processed
    async fn write_batch(&self, items: Vec<T>) -> Result<Vec<T>>;
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Attempts allowed per distinct item (the initial write counts)
    pub max_retries: u32,
    /// Write queue capacity; unbounded when `None`
    pub max_queue_size: Option<usize>,
    /// Pause before a round that retries unprocessed items
    pub retry_backoff: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: 3,
            max_queue_size: None,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl BatchOptions {
    /// Retry budget from `[queue]`; queue size from `queue.capacity`, else
    /// `monitor.max_new_transactions`
    pub fn from_config(config: &Config) -> Self {
        let max_queue_size = config
            .queue
            .capacity
            .unwrap_or(config.monitor.max_new_transactions);

        Self {
            max_retries: config.queue.max_retries,
            max_queue_size: Some(max_queue_size),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct BatchReport<T> {
    /// Items the writer accepted
    pub written: usize,
    /// Items given up on after exhausting their retry budget
    pub dead_letters: Vec<T>,
    /// Number of `write_batch` calls made
    pub rounds: usize,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            written: 0,
            dead_letters: Vec::new(),
            rounds: 0,
        }
    }
}

/// Write every item, retrying unprocessed ones within their retry budget
///
/// Fails with `Backpressure` before writing anything when the input does not
/// fit in the write queue. Equal items in the input share one retry budget.
pub async fn write_all<T, W>(
    writer: &W,
    items: Vec<T>,
    options: &BatchOptions,
    metrics: &Metrics,
) -> Result<BatchReport<T>>
where
    T: Serialize + Clone + Send + 'static,
    W: BatchWriter<T> + ?Sized,
{
    if let Some(capacity) = options.max_queue_size
        && items.len() > capacity
    {
        return Err(BatchError::Backpressure {
            items: items.len(),
            capacity,
        });
    }

    let queue = RetryLimitQueue::new(options.max_retries, options.max_queue_size)?;
    let batch_size = options.batch_size.max(1);
    let mut report = BatchReport::default();

    for item in items {
        enqueue_or_dead_letter(&queue, item, &mut report, metrics)?;
    }

    let mut retrying = false;
    loop {
        let batch = take_batch(&queue, batch_size);
        if batch.is_empty() {
            break;
        }

        if retrying && !options.retry_backoff.is_zero() {
            tokio::time::sleep(options.retry_backoff).await;
        }

        report.rounds += 1;
        let sent = batch.len();
        let unprocessed = writer.write_batch(batch).await?;
        let written = sent.saturating_sub(unprocessed.len());

        report.written += written;
        metrics.items_written(written as u64);

        debug!(
            round = report.rounds,
            sent,
            unprocessed = unprocessed.len(),
            "Batch written"
        );

        retrying = !unprocessed.is_empty();
        for item in unprocessed {
            if enqueue_or_dead_letter(&queue, item, &mut report, metrics)? {
                metrics.item_requeued();
            }
        }
    }

    info!(
        rounds = report.rounds,
        written = report.written,
        dead_lettered = report.dead_letters.len(),
        "Batch write complete"
    );

    Ok(report)
}

/// Returns whether the item was queued
fn enqueue_or_dead_letter<T>(
    queue: &RetryLimitQueue<T>,
    item: T,
    report: &mut BatchReport<T>,
    metrics: &Metrics,
) -> Result<bool>
where
    T: Serialize + Clone,
{
    match queue.put_nowait(item.clone()) {
        Ok(()) => Ok(true),
        Err(err) if err.is_retry_exhausted() || err.is_full() => {
            warn!(error = %err, "Item dead-lettered");
            metrics.item_dead_lettered();
            report.dead_letters.push(item);
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn take_batch<T: Serialize>(queue: &RetryLimitQueue<T>, batch_size: usize) -> Vec<T> {
    let mut batch = Vec::with_capacity(batch_size.min(queue.len()));
    while batch.len() < batch_size {
        match queue.get_nowait() {
            Ok(item) => batch.push(item),
            Err(_) => break,
        }
    }
    batch
}
