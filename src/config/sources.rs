use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "TWSECURE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/twsecure.toml";
const ENV_PREFIX: &str = "TWSECURE";
const ENV_SEPARATOR: &str = "__";

const FROM_PHONE_ENV_VAR: &str = "SMS_FROM_NUMBER";
const TO_PHONE_ENV_VAR: &str = "SEND_SMS_TO_PHONE_NUMBER";

/// Resolve the config file from `TWSECURE_CONFIG` (else `config/twsecure.toml`),
/// layer `TWSECURE__*` variables over it, then pick up the phone numbers.
///
/// A `.env` file, when present, feeds the process environment first.
pub fn load() -> Result<Config, ConfigError> {
    // Missing .env is normal outside development
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;

    load_secrets(&mut config);

    Ok(config)
}

/// Phone numbers are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    if let Ok(from) = env::var(FROM_PHONE_ENV_VAR) {
        config.secrets.from_phone_number = Some(from);
    }
    if let Ok(to) = env::var(TO_PHONE_ENV_VAR) {
        config.secrets.to_phone_number = Some(to);
    }
}

/// Struct defaults, then `config_path` if it exists, then `TWSECURE__*`
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!(path = %config_path.display(), "Reading config file");
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            path = %config_path.display(),
            "No config file, running on defaults and TWSECURE__* overrides"
        );
    }

    // TWSECURE__QUEUE__MAX_RETRIES -> queue.max_retries
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
