//! Logging setup and in-process counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

/// Swaps the log filter of the installed subscriber
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `None` when a
/// subscriber was already installed (tests, embedding).
pub fn init_tracing(default_filter: &str) -> Option<FilterHandle> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .ok()?;

    Some(handle)
}

/// Apply the configured filter once config is loaded, unless `RUST_LOG` is set
pub fn apply_filter(handle: &FilterHandle, filter: &str) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    reload_filter(handle, filter);
}

fn reload_filter(handle: &FilterHandle, filter: &str) {
    if let Err(err) = handle.reload(EnvFilter::new(filter)) {
        tracing::warn!(error = %err, filter, "Failed to apply log filter");
    }
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    items_written: AtomicU64,
    items_requeued: AtomicU64,
    items_dead_lettered: AtomicU64,
    alerts_sent: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items_written(&self, count: u64) {
        self.items_written.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "items_written", count, "Metric incremented");
    }

    pub fn item_requeued(&self) {
        self.items_requeued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "items_requeued", "Metric incremented");
    }

    pub fn item_dead_lettered(&self) {
        self.items_dead_lettered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "items_dead_lettered", "Metric incremented");
    }

    pub fn alert_sent(&self) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "alerts_sent", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_written: self.items_written.load(Ordering::Relaxed),
            items_requeued: self.items_requeued.load(Ordering::Relaxed),
            items_dead_lettered: self.items_dead_lettered.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_written: u64,
    pub items_requeued: u64,
    pub items_dead_lettered: u64,
    pub alerts_sent: u64,
}
