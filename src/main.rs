mod cli;

use clap::Parser;
use chrono::Utc;
use cli::{AlertArgs, Cli, Commands, MonitorArgs};
use twsecure::alert::{self, AlertTemplates, Recipients, StreamEvent};
use twsecure::batch::BatchOptions;
use twsecure::config::Config;
use twsecure::interval::last_delta;
use twsecure::notify::LogNotifier;
use twsecure::observability::{self, Metrics};
use twsecure::queue::fingerprint;
use twsecure::transaction::{self, MemoryStore, StatementFile};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    let filter = observability::init_tracing("info");
    let config = Config::load()?;
    if let Some(handle) = &filter {
        observability::apply_filter(handle, &config.telemetry.log_filter);
    }

    match cli.command {
        Commands::Fingerprint(args) => {
            let item: serde_json::Value = serde_json::from_str(&args.item)?;
            println!("{}", fingerprint(&item)?);
        }
        Commands::Monitor(args) => run_monitor(&config, args).await?,
        Commands::Alert(args) => run_alert(&config, args).await?,
        Commands::Config => print!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(())
}

async fn run_monitor(config: &Config, args: MonitorArgs) -> Result<(), AnyError> {
    let source = StatementFile::new(args.statement, args.account);
    let store = MemoryStore::new();
    let interval = last_delta(config.monitor.lookback(), Utc::now());

    let report = transaction::run_monitor(
        &source,
        &store,
        interval,
        config.monitor.ttl_days,
        &BatchOptions::from_config(config),
        &Metrics::new(),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_alert(config: &Config, args: AlertArgs) -> Result<(), AnyError> {
    let raw = tokio::fs::read_to_string(&args.event).await?;
    let event: StreamEvent = serde_json::from_str(&raw)?;

    let table = args
        .table
        .unwrap_or_else(|| config.notifier.transactions_table.clone());
    let recipients = Recipients {
        from: config.secrets.from_phone_number.clone().unwrap_or_default(),
        to: config.secrets.to_phone_number.clone().unwrap_or_default(),
    };
    let templates = AlertTemplates::with_max_length(config.notifier.message_max_length);
    let metrics = Metrics::new();

    let transactions = alert::transactions_from_event(&event, &table)?;
    if let Some(message) = alert::build_alert_message(&transactions, &templates) {
        println!("{message}");
    }

    let outcome = alert::process_event(
        &event,
        &table,
        &templates,
        &LogNotifier::new(),
        &recipients,
        &metrics,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
