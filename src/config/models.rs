use crate::interval::DeltaUnit;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Loaded from the environment only, never from files
    #[serde(skip)]
    pub secrets: Secrets,
}

/// Retry queue limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Buffer capacity; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            capacity: None,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

/// Transaction monitor settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// How long stored transactions live before the table expires them
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
    /// Upper bound on transactions written per run (also the write queue capacity)
    #[serde(default = "default_max_new_transactions")]
    pub max_new_transactions: usize,
    /// Lookback window unit; the monitor looks back 24 hours when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_unit: Option<DeltaUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_value: Option<i64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            max_new_transactions: default_max_new_transactions(),
            delta_unit: None,
            delta_value: None,
        }
    }
}

fn default_ttl_days() -> u32 {
    7
}

fn default_max_new_transactions() -> usize {
    10
}

/// SMS alert settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    #[serde(default = "default_message_max_length")]
    pub message_max_length: usize,
    /// Table whose stream events carry new transactions
    #[serde(default = "default_transactions_table")]
    pub transactions_table: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            message_max_length: default_message_max_length(),
            transactions_table: default_transactions_table(),
        }
    }
}

fn default_message_max_length() -> usize {
    300
}

fn default_transactions_table() -> String {
    "transactions".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Phone numbers for alert delivery
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub from_phone_number: Option<String>,
    pub to_phone_number: Option<String>,
}
