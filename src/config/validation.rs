use super::models::Config;
use crate::alert::MULTI_TRANSACTION_TEMPLATE;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("queue.max_retries must be at least 1")]
    ZeroMaxRetries,

    #[error("queue.capacity must be positive when set")]
    ZeroCapacity,

    #[error("Monitor limit must be positive: {field} = 0")]
    ZeroMonitorLimit { field: String },

    #[error("monitor.delta_unit and monitor.delta_value must be set together")]
    IncompleteDelta,

    #[error("monitor.delta_value must be positive: {0}")]
    NonPositiveDelta(i64),

    #[error("monitor lookback of {value} {unit} is out of range")]
    DeltaOutOfRange { unit: String, value: i64 },

    #[error("notifier.message_max_length ({actual}) is shorter than the alert template ({minimum})")]
    MessageTooShort { actual: usize, minimum: usize },

    #[error("notifier.transactions_table must not be empty")]
    EmptyTableName,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_queue(config)?;
    validate_monitor(config)?;
    validate_notifier(config)?;
    Ok(())
}

fn validate_queue(config: &Config) -> Result<(), ValidationError> {
    if config.queue.max_retries == 0 {
        return Err(ValidationError::ZeroMaxRetries);
    }

    if config.queue.capacity == Some(0) {
        return Err(ValidationError::ZeroCapacity);
    }

    Ok(())
}

fn validate_monitor(config: &Config) -> Result<(), ValidationError> {
    if config.monitor.ttl_days == 0 {
        return Err(ValidationError::ZeroMonitorLimit {
            field: "ttl_days".to_string(),
        });
    }

    if config.monitor.max_new_transactions == 0 {
        return Err(ValidationError::ZeroMonitorLimit {
            field: "max_new_transactions".to_string(),
        });
    }

    match (config.monitor.delta_unit, config.monitor.delta_value) {
        (None, None) => Ok(()),
        (Some(_), Some(value)) if value <= 0 => Err(ValidationError::NonPositiveDelta(value)),
        (Some(unit), Some(value)) => match unit.duration(value) {
            Some(_) => Ok(()),
            None => Err(ValidationError::DeltaOutOfRange {
                unit: unit.to_string(),
                value,
            }),
        },
        _ => Err(ValidationError::IncompleteDelta),
    }
}

/// The payee list budget is `max_length - template length`, so the
/// template itself has to fit
fn validate_notifier(config: &Config) -> Result<(), ValidationError> {
    let minimum = MULTI_TRANSACTION_TEMPLATE.len();

    if config.notifier.message_max_length < minimum {
        return Err(ValidationError::MessageTooShort {
            actual: config.notifier.message_max_length,
            minimum,
        });
    }

    if config.notifier.transactions_table.trim().is_empty() {
        return Err(ValidationError::EmptyTableName);
    }

    Ok(())
}
