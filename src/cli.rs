use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "twsecure")]
#[command(about = "Transaction alert tooling", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the retry-queue fingerprint of a JSON item
    Fingerprint(FingerprintArgs),
    /// Store new debits from a statement export into an in-memory table
    Monitor(MonitorArgs),
    /// Build (and log-send) the alert for a table stream event
    Alert(AlertArgs),
    /// Print the resolved configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct FingerprintArgs {
    /// Item as JSON text, e.g. '{"hello":"world"}'
    pub item: String,
}

#[derive(clap::Args, Debug)]
pub struct MonitorArgs {
    /// Path to a statement JSON file
    #[arg(long)]
    pub statement: PathBuf,

    /// Account label shown in alerts
    #[arg(long, default_value = "Personal")]
    pub account: String,
}

#[derive(clap::Args, Debug)]
pub struct AlertArgs {
    /// Path to a stream event JSON file
    #[arg(long)]
    pub event: PathBuf,

    /// Table name filter (defaults to notifier.transactions_table)
    #[arg(long)]
    pub table: Option<String>,
}
