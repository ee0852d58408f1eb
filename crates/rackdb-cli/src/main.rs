//! rackdb command-line interface
//!
//! Inventory store for physical and virtual hosts, backed by etcd, plus a
//! collection pipeline that enriches stored records with externally
//! collected facts and emits consolidated reports.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use rackdb_inventory::Inventory;
use rackdb_storage::open_storage;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::Command;
use config::Config;

#[derive(Parser)]
#[command(name = "rackdb", version, about = "Host inventory store and report pipeline")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let storage = open_storage(&config.storage).await?;
    let mut inventory = Inventory::new(storage);

    let outcome = dispatch(&inventory, cli.command).await;
    inventory.close().await?;
    outcome
}

async fn dispatch(inventory: &Inventory, command: Command) -> Result<()> {
    match command {
        Command::Host { action } => commands::run_host(inventory, action).await,
        Command::Report(args) => commands::run_report(inventory, args).await,
        Command::Locate { action } => commands::run_locate(inventory, action).await,
    }
}
