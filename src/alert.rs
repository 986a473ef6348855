//! SMS alerts for newly stored transactions
//!
//! New rows in the transactions table arrive as a stream event. Inserted
//! rows become one SMS: a detailed line for a single debit, or a payee
//! summary (truncated to fit the SMS budget) for several.

use crate::notify::{Notifier, NotifyError, SendReceipt};
use crate::observability::Metrics;
use crate::transaction::{HashedTransaction, TransactionDetails};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

pub const SMS_MESSAGE_MAX_CHAR_LENGTH: usize = 300;
pub const SINGLE_TRANSACTION_TEMPLATE: &str =
    "Transferwise debit: {currency} {value} from {account} to {payee} (reply STOP to unsubscribe)";
pub const MULTI_TRANSACTION_TEMPLATE: &str =
    "Transferwise {transactions_count} debits to: {payees} (reply STOP to unsubscribe)";
const TRUNCATION_SUFFIX: &str = "... and others";
const INSERT_EVENT: &str = "INSERT";
const HASH_ATTRIBUTE: &str = "transaction-hash";
const DETAILS_ATTRIBUTE: &str = "details";

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Stream record is missing attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Invalid transaction details: {0}")]
    InvalidDetails(#[from] serde_json::Error),

    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),
}

pub type Result<T> = std::result::Result<T, AlertError>;

/// Table stream event
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub dynamodb: StreamImage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamImage {
    #[serde(rename = "Keys", default)]
    pub keys: HashMap<String, AttributeValue>,
    #[serde(rename = "NewImage", default)]
    pub new_image: Option<HashMap<String, AttributeValue>>,
}

/// Typed attribute; only string and number attributes are read
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttributeValue {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
}

impl StreamRecord {
    fn is_insert_into(&self, table_name: &str) -> bool {
        self.event_name == INSERT_EVENT && self.event_source_arn.contains(table_name)
    }

    fn to_transaction(&self) -> Result<HashedTransaction> {
        let transaction_hash = self
            .dynamodb
            .keys
            .get(HASH_ATTRIBUTE)
            .and_then(|v| v.s.clone())
            .ok_or(AlertError::MissingAttribute(HASH_ATTRIBUTE))?;

        let details = self
            .dynamodb
            .new_image
            .as_ref()
            .and_then(|image| image.get(DETAILS_ATTRIBUTE))
            .and_then(|v| v.s.as_deref())
            .ok_or(AlertError::MissingAttribute(DETAILS_ATTRIBUTE))?;

        Ok(HashedTransaction {
            transaction_hash,
            details: serde_json::from_str(details)?,
        })
    }
}

/// Inserted transactions of `table_name` carried by the event
pub fn transactions_from_event(
    event: &StreamEvent,
    table_name: &str,
) -> Result<Vec<HashedTransaction>> {
    event
        .records
        .iter()
        .filter(|record| record.is_insert_into(table_name))
        .map(StreamRecord::to_transaction)
        .collect()
}

/// Message templates and length budget
#[derive(Debug, Clone)]
pub struct AlertTemplates {
    pub single: String,
    pub multi: String,
    pub max_length: usize,
}

impl Default for AlertTemplates {
    fn default() -> Self {
        Self {
            single: SINGLE_TRANSACTION_TEMPLATE.to_string(),
            multi: MULTI_TRANSACTION_TEMPLATE.to_string(),
            max_length: SMS_MESSAGE_MAX_CHAR_LENGTH,
        }
    }
}

impl AlertTemplates {
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            ..Self::default()
        }
    }
}

/// Build the SMS text, or `None` when there is nothing to report
pub fn build_alert_message(
    transactions: &[HashedTransaction],
    templates: &AlertTemplates,
) -> Option<String> {
    match transactions {
        [] => None,
        [only] => Some(render_single(&templates.single, &only.details)),
        many => Some(render_multi(many, templates)),
    }
}

fn render_single(template: &str, details: &TransactionDetails) -> String {
    render(
        template,
        &[
            ("currency", &details.currency),
            ("value", &details.value),
            ("account", &details.account),
            ("payee", &details.payee),
        ],
    )
}

fn render_multi(transactions: &[HashedTransaction], templates: &AlertTemplates) -> String {
    // Budget counts the raw template, placeholders included
    let max_payees_length = templates
        .max_length
        .saturating_sub(templates.multi.chars().count());

    let mut payees = transactions
        .iter()
        .map(|t| format!("{} ({})", t.details.payee, t.details.value))
        .collect::<Vec<_>>()
        .join(", ");

    if payees.chars().count() > max_payees_length {
        payees = payees.chars().take(max_payees_length).collect();
        payees.push_str(TRUNCATION_SUFFIX);
    }

    let count = transactions.len().to_string();
    render(
        &templates.multi,
        &[("transactions_count", &count), ("payees", &payees)],
    )
}

/// Fill `{name}` placeholders in one pass; substituted text is never rescanned
fn render(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        let field = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            fields
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });

        match field {
            Some((close, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Result of handling one stream event
#[derive(Debug, Clone, Serialize)]
pub struct AlertOutcome {
    pub send_message_response: Option<SendReceipt>,
    pub transactions: Vec<HashedTransaction>,
}

/// Who sends and who receives the alert
#[derive(Debug, Clone)]
pub struct Recipients {
    pub from: String,
    pub to: String,
}

/// Extract inserted transactions and send one alert covering all of them
pub async fn process_event<N>(
    event: &StreamEvent,
    table_name: &str,
    templates: &AlertTemplates,
    notifier: &N,
    recipients: &Recipients,
    metrics: &Metrics,
) -> Result<AlertOutcome>
where
    N: Notifier + ?Sized,
{
    let transactions = transactions_from_event(event, table_name)?;
    debug!(
        records = event.records.len(),
        transactions = transactions.len(),
        "Stream event parsed"
    );

    let send_message_response = match build_alert_message(&transactions, templates) {
        Some(message) => {
            let receipt = notifier
                .send(&message, &recipients.from, &recipients.to)
                .await?;
            metrics.alert_sent();
            info!(
                message_id = %receipt.message_id,
                transactions = transactions.len(),
                "Alert sent"
            );
            Some(receipt)
        }
        None => None,
    };

    Ok(AlertOutcome {
        send_message_response,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    const TABLE: &str = "ddb-table-name";

    fn record(
        event_name: &str,
        table: &str,
        hash: &str,
        value: &str,
        payee: &str,
    ) -> serde_json::Value {
        let details = json!({
            "account": "Dummy",
            "currency": "XYZ",
            "value": value,
            "payee": payee,
        });
        json!({
            "eventID": "c4ca4238a0b923820dcc509a6f75849b",
            "eventName": event_name,
            "eventSource": "aws:dynamodb",
            "dynamodb": {
                "Keys": {"transaction-hash": {"S": hash}},
                "NewImage": {
                    "transaction-hash": {"S": hash},
                    "details": {"S": details.to_string()},
                },
                "SequenceNumber": "4421584500000000017450439091",
            },
            "eventSourceARN": format!(
                "arn:aws:dynamodb:us-east-1:123456789012:table/{table}/stream/2015-06-27T00:48:05.899"
            ),
        })
    }

    fn sample_event() -> StreamEvent {
        serde_json::from_value(json!({
            "Records": [
                record("INSERT", TABLE, "hash-1", "12.34", "Dummy Merchant"),
                record("INSERT", TABLE, "hash-2", "50.00", "Dummy Recipient"),
                record("INSERT", TABLE, "hash-3", "95.50", "Undetermined"),
                record("MODIFY", TABLE, "hash-4", "1.00", "Ignored"),
                record("INSERT", "other-table", "hash-5", "1.00", "Ignored"),
            ]
        }))
        .unwrap()
    }

    fn transaction(i: usize) -> HashedTransaction {
        HashedTransaction {
            transaction_hash: format!("hash-{i}"),
            details: TransactionDetails {
                account: "Dummy".to_string(),
                currency: "XYZ".to_string(),
                value: format!("{i}.00"),
                payee: format!("Dummy Merchant {i}"),
            },
        }
    }

    fn recipients() -> Recipients {
        Recipients {
            from: "+9876543210".to_string(),
            to: "+1234567890".to_string(),
        }
    }

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn send(
            &self,
            message: &str,
            _from: &str,
            _to: &str,
        ) -> crate::notify::Result<SendReceipt> {
            self.sent.lock().push(message.to_string());
            Ok(SendReceipt {
                message_id: "sid-0".to_string(),
                status: "confirmed".to_string(),
                error_code: None,
                error_message: None,
            })
        }
    }

    #[test]
    fn test_transactions_from_event() {
        let items = transactions_from_event(&sample_event(), TABLE).unwrap();

        let hashes: Vec<_> = items.iter().map(|t| t.transaction_hash.as_str()).collect();
        assert_eq!(hashes, vec!["hash-1", "hash-2", "hash-3"]);
        assert_eq!(items[1].details.payee, "Dummy Recipient");
        assert_eq!(items[2].details.value, "95.50");
    }

    #[test]
    fn test_missing_details_attribute() {
        let mut raw = record("INSERT", TABLE, "hash-1", "1.00", "Shop");
        raw["dynamodb"]["NewImage"] = json!({});
        let event: StreamEvent = serde_json::from_value(json!({"Records": [raw]})).unwrap();

        assert!(matches!(
            transactions_from_event(&event, TABLE),
            Err(AlertError::MissingAttribute("details"))
        ));
    }

    #[test]
    fn test_single_transaction_message() {
        let single = HashedTransaction {
            transaction_hash: "hash-1".to_string(),
            details: TransactionDetails {
                account: "Personal".to_string(),
                currency: "XYZ".to_string(),
                value: "12.34".to_string(),
                payee: "Merchant".to_string(),
            },
        };

        assert_eq!(
            build_alert_message(&[single], &AlertTemplates::default()).unwrap(),
            "Transferwise debit: XYZ 12.34 from Personal to Merchant (reply STOP to unsubscribe)"
        );
    }

    #[test]
    fn test_placeholder_text_in_values_is_literal() {
        let single = HashedTransaction {
            transaction_hash: "hash-1".to_string(),
            details: TransactionDetails {
                account: "{payee}".to_string(),
                currency: "{value}".to_string(),
                value: "1.00".to_string(),
                payee: "Shop {account}".to_string(),
            },
        };

        assert_eq!(
            build_alert_message(&[single], &AlertTemplates::default()).unwrap(),
            "Transferwise debit: {value} 1.00 from {payee} to Shop {account} (reply STOP to unsubscribe)"
        );
    }

    #[test]
    fn test_multi_payees_keep_braces() {
        let mut transactions: Vec<_> = (0..2).map(transaction).collect();
        transactions[0].details.payee = "{transactions_count}".to_string();

        let message = build_alert_message(&transactions, &AlertTemplates::default()).unwrap();
        assert!(message.starts_with("Transferwise 2 debits to: {transactions_count} (0.00), "));
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        assert_eq!(render("a {b} {c", &[("c", "x")]), "a {b} {c");
        assert_eq!(render("{c}{c}}", &[("c", "x")]), "xx}");
    }

    #[test]
    fn test_multi_transaction_message() {
        let transactions: Vec<_> = (0..2).map(transaction).collect();

        assert_eq!(
            build_alert_message(&transactions, &AlertTemplates::default()).unwrap(),
            "Transferwise 2 debits to: Dummy Merchant 0 (0.00), Dummy Merchant 1 (1.00) (reply STOP to unsubscribe)"
        );
    }

    #[test]
    fn test_multi_transaction_message_truncates() {
        let transactions: Vec<_> = (0..200).map(transaction).collect();

        let message = build_alert_message(&transactions, &AlertTemplates::default()).unwrap();

        assert!(message.chars().count() < SMS_MESSAGE_MAX_CHAR_LENGTH);
        assert!(message.contains("... and others"));
        assert!(message.starts_with("Transferwise 200 debits to: Dummy Merchant 0 (0.00)"));
    }

    #[test]
    fn test_truncation_respects_multibyte_payees() {
        let mut transactions: Vec<_> = (0..40).map(transaction).collect();
        for t in &mut transactions {
            t.details.payee = "Café Zürich".to_string();
        }

        let templates = AlertTemplates::with_max_length(120);
        let message = build_alert_message(&transactions, &templates).unwrap();
        assert!(message.contains("... and others"));
    }

    #[test]
    fn test_no_transactions_no_message() {
        assert!(build_alert_message(&[], &AlertTemplates::default()).is_none());
    }

    #[tokio::test]
    async fn test_process_event_sends_one_alert() {
        let notifier = CapturingNotifier::default();
        let metrics = Metrics::new();

        let outcome = process_event(
            &sample_event(),
            TABLE,
            &AlertTemplates::default(),
            &notifier,
            &recipients(),
            &metrics,
        )
        .await
        .unwrap();

        assert_eq!(outcome.transactions.len(), 3);
        assert_eq!(outcome.send_message_response.unwrap().message_id, "sid-0");

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Transferwise 3 debits to:"));
        assert_eq!(metrics.snapshot().alerts_sent, 1);
    }

    #[tokio::test]
    async fn test_process_event_without_inserts() {
        let notifier = CapturingNotifier::default();
        let event = StreamEvent { records: Vec::new() };

        let outcome = process_event(
            &event,
            TABLE,
            &AlertTemplates::default(),
            &notifier,
            &recipients(),
            &Metrics::new(),
        )
        .await
        .unwrap();

        assert!(outcome.send_message_response.is_none());
        assert!(outcome.transactions.is_empty());
        assert!(notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_process_event_propagates_notifier_errors() {
        let missing = Recipients {
            from: String::new(),
            to: "+1234567890".to_string(),
        };

        let err = process_event(
            &sample_event(),
            TABLE,
            &AlertTemplates::default(),
            &LogNotifier::new(),
            &missing,
            &Metrics::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AlertError::Notify(NotifyError::MissingPhoneNumber(_))));
    }
}
