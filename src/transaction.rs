//! Debit transactions: shaping, hashing, deduplication and storage

use crate::batch::{self, BatchError, BatchOptions, BatchReport, BatchWriter};
use crate::interval::Interval;
use crate::observability::Metrics;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const UNDETERMINED_PAYEE: &str = "Undetermined";
const DEBIT: &str = "DEBIT";

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Statement entry is missing field: {0}")]
    MissingField(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction source failed: {0}")]
    Source(String),

    #[error("Transaction store failed: {0}")]
    Store(String),

    #[error("Batch write failed: {0}")]
    Batch(#[from] BatchError),
}

pub type Result<T> = std::result::Result<T, TransactionError>;

/// What an alert says about one debit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionDetails {
    pub account: String,
    pub currency: String,
    pub value: String,
    pub payee: String,
}

impl TransactionDetails {
    /// Shape one statement entry, or `None` if it is not a debit
    pub fn from_statement(account: &str, entry: &Value) -> Result<Option<Self>> {
        let kind = entry
            .get("type")
            .and_then(Value::as_str)
            .ok_or(TransactionError::MissingField("type"))?;
        if kind != DEBIT {
            return Ok(None);
        }

        let amount = entry
            .get("amount")
            .ok_or(TransactionError::MissingField("amount"))?;
        let currency = amount
            .get("currency")
            .and_then(Value::as_str)
            .ok_or(TransactionError::MissingField("amount.currency"))?;
        let value = amount
            .get("value")
            .and_then(Value::as_f64)
            .ok_or(TransactionError::MissingField("amount.value"))?;

        Ok(Some(Self {
            account: account.to_string(),
            currency: currency.to_string(),
            value: format_value(value),
            payee: payee_from(entry),
        }))
    }
}

/// Details keyed by their content hash
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HashedTransaction {
    #[serde(rename = "transaction-hash")]
    pub transaction_hash: String,
    pub details: TransactionDetails,
}

impl HashedTransaction {
    pub fn new(details: TransactionDetails) -> Result<Self> {
        Ok(Self {
            transaction_hash: hash_details(&details)?,
            details,
        })
    }
}

/// Row written to the transactions table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredTransaction {
    #[serde(rename = "transaction-hash")]
    pub transaction_hash: String,
    /// JSON-encoded `TransactionDetails`
    pub details: String,
    /// Expiry, epoch seconds
    pub ttl: i64,
}

impl StoredTransaction {
    pub fn new(transaction: &HashedTransaction, ttl: i64) -> Result<Self> {
        Ok(Self {
            transaction_hash: transaction.transaction_hash.clone(),
            details: serde_json::to_string(&transaction.details)?,
            ttl,
        })
    }
}

/// Merchant name, else recipient name, else `Undetermined`
pub fn payee_from(entry: &Value) -> String {
    let details = entry.get("details");

    ["merchant", "recipient"]
        .iter()
        .find_map(|party| {
            details
                .and_then(|d| d.get(*party))
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
        })
        .unwrap_or(UNDETERMINED_PAYEE)
        .to_string()
}

/// Debits come back negative; alerts show the magnitude
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value.abs())
}

/// First word of the personal (`firstName`) or business (`name`) profile name
pub fn account_label(profile_details: &Value) -> String {
    profile_details
        .get("firstName")
        .or_else(|| profile_details.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .split(' ')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn hash_details(details: &TransactionDetails) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_string(details)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Epoch seconds `days` after `now`
pub fn ttl_after(now: DateTime<Utc>, days: u32) -> i64 {
    (now + TimeDelta::days(i64::from(days))).timestamp()
}

/// Upstream provider of recent debits
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn debits(&self, interval: Interval) -> Result<Vec<TransactionDetails>>;
}

/// Statement export on disk: `{"transactions": [...]}` or a bare array
#[derive(Debug, Clone)]
pub struct StatementFile {
    path: PathBuf,
    account: String,
}

impl StatementFile {
    pub fn new(path: impl Into<PathBuf>, account: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            account: account.into(),
        }
    }
}

#[async_trait]
impl TransactionSource for StatementFile {
    async fn debits(&self, interval: Interval) -> Result<Vec<TransactionDetails>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| TransactionError::Source(format!("{}: {err}", self.path.display())))?;
        let statement: Value = serde_json::from_str(&raw)?;

        debits_in(&self.account, &statement, interval)
    }
}

/// Debits of a statement dated inside `interval`; undated entries are kept
pub fn debits_in(
    account: &str,
    statement: &Value,
    interval: Interval,
) -> Result<Vec<TransactionDetails>> {
    let entries = statement
        .get("transactions")
        .unwrap_or(statement)
        .as_array()
        .ok_or(TransactionError::MissingField("transactions"))?;

    let mut debits = Vec::new();
    for entry in entries.iter().filter(|entry| dated_within(entry, interval)) {
        if let Some(details) = TransactionDetails::from_statement(account, entry)? {
            debits.push(details);
        }
    }
    Ok(debits)
}

fn dated_within(entry: &Value, interval: Interval) -> bool {
    let Some(date) = entry.get("date").and_then(Value::as_str) else {
        return true;
    };

    match DateTime::parse_from_rfc3339(date) {
        Ok(date) => {
            let date = date.with_timezone(&Utc);
            interval.start <= date && date <= interval.end
        }
        Err(err) => {
            warn!(date, error = %err, "Skipping statement entry with unreadable date");
            false
        }
    }
}

/// Table of already-alerted transactions
#[async_trait]
pub trait TransactionStore: BatchWriter<StoredTransaction> {
    /// Which of `hashes` are already stored
    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>>;
}

/// Keep only transactions the store has not seen, in input order
pub async fn filter_new<S>(
    store: &S,
    transactions: Vec<HashedTransaction>,
) -> Result<Vec<HashedTransaction>>
where
    S: TransactionStore + ?Sized,
{
    let hashes: Vec<String> = transactions
        .iter()
        .map(|t| t.transaction_hash.clone())
        .collect();
    let existing = store.existing_hashes(&hashes).await?;

    Ok(transactions
        .into_iter()
        .filter(|t| !existing.contains(&t.transaction_hash))
        .collect())
}

/// Store transactions with an expiry `ttl_days` from `now`
pub async fn insert<S>(
    store: &S,
    transactions: &[HashedTransaction],
    ttl_days: u32,
    now: DateTime<Utc>,
    options: &BatchOptions,
    metrics: &Metrics,
) -> Result<BatchReport<StoredTransaction>>
where
    S: TransactionStore + ?Sized,
{
    let ttl = ttl_after(now, ttl_days);
    let rows = transactions
        .iter()
        .map(|t| StoredTransaction::new(t, ttl))
        .collect::<Result<Vec<_>>>()?;

    Ok(batch::write_all(store, rows, options, metrics).await?)
}

/// Counts reported by one monitor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    pub retrieved: usize,
    pub new: usize,
    pub stored: usize,
    pub dead_lettered: usize,
}

/// Fetch recent debits, drop the ones already stored, store the rest
pub async fn run_monitor<Src, St>(
    source: &Src,
    store: &St,
    interval: Interval,
    ttl_days: u32,
    options: &BatchOptions,
    metrics: &Metrics,
) -> Result<MonitorReport>
where
    Src: TransactionSource + ?Sized,
    St: TransactionStore + ?Sized,
{
    let hashed = source
        .debits(interval)
        .await?
        .into_iter()
        .map(HashedTransaction::new)
        .collect::<Result<Vec<_>>>()?;

    let fresh = filter_new(store, hashed.clone()).await?;

    let mut report = MonitorReport {
        retrieved: hashed.len(),
        new: fresh.len(),
        ..MonitorReport::default()
    };

    if !fresh.is_empty() {
        let written = insert(store, &fresh, ttl_days, interval.end, options, metrics).await?;
        report.stored = written.written;
        report.dead_lettered = written.dead_letters.len();
    }

    info!(
        retrieved = report.retrieved,
        new = report.new,
        stored = report.stored,
        "Monitor run complete"
    );

    Ok(report)
}

/// In-memory transaction table
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, StoredTransaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<StoredTransaction> {
        self.rows.lock().get(hash).cloned()
    }
}

#[async_trait]
impl BatchWriter<StoredTransaction> for MemoryStore {
    async fn write_batch(
        &self,
        items: Vec<StoredTransaction>,
    ) -> batch::Result<Vec<StoredTransaction>> {
        let mut rows = self.rows.lock();
        for item in items {
            rows.insert(item.transaction_hash.clone(), item);
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>> {
        let rows = self.rows.lock();
        Ok(hashes
            .iter()
            .filter(|h| rows.contains_key(*h))
            .cloned()
            .collect())
    }
}
