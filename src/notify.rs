//! SMS delivery abstraction
//!
//! The real SMS gateway lives outside this crate; it only has to implement
//! `Notifier`. `LogNotifier` stands in for it during development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Missing phone number: {0}")]
    MissingPhoneNumber(&'static str),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

/// Gateway response for one sent message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub status: String,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, from: &str, to: &str) -> Result<SendReceipt>;
}

/// Notifier that only logs the message
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, from: &str, to: &str) -> Result<SendReceipt> {
        if from.is_empty() {
            return Err(NotifyError::MissingPhoneNumber("from"));
        }
        if to.is_empty() {
            return Err(NotifyError::MissingPhoneNumber("to"));
        }

        let message_id = Uuid::new_v4().simple().to_string();
        tracing::info!(
            %message_id,
            from,
            to,
            chars = message.chars().count(),
            "SMS message queued"
        );
        tracing::debug!(message, "SMS body");

        Ok(SendReceipt {
            message_id,
            status: "queued".to_string(),
            error_code: None,
            error_message: None,
        })
    }
}
