//! Pomodoro Tasks server
//!
//! Serves task CRUD and pomodoro statistics as a JSON API over SQLite.

use anyhow::{Context, Result};
use clap::Parser;
use pomodoro_tasks::api;
use pomodoro_tasks::cli::{Cli, Command};
use pomodoro_tasks::config::Config;
use pomodoro_tasks::db::Database;
use pomodoro_tasks::logging::{self, LogTarget};
use std::sync::Arc;
use tracing::{error, info};

/// Open the store and bring its schema up to date.
fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    Database::open(&config.server.db_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.server.db_path.display()
        )
    })
}

async fn serve(config: Config) -> Result<()> {
    let db = Arc::new(open_database(&config)?);
    let handle = api::start_server(db, &config).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    handle.shutdown().await;
    Ok(())
}

fn migrate(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    match db.schema_version()? {
        Some(version) => println!(
            "{}: schema version {}",
            config.server.db_path.display(),
            version
        ),
        None => println!("{}: no migrations applied", config.server.db_path.display()),
    }
    Ok(())
}

fn print_stats(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let stats = db.get_stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let config = cli.apply_overrides(config);

    match cli.command() {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config),
        Command::Stats => print_stats(&config),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_target = LogTarget::parse(&cli.log);

    if let Err(e) = logging::init(&log_target, cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        if log_target == LogTarget::Off {
            eprintln!("Error: {:#}", e);
        } else {
            error!("{:#}", e);
        }
        std::process::exit(1);
    }
}
