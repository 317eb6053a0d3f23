//! CLI command definitions for pomodoro-tasks
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pomodoro task tracker HTTP API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Allowed CORS origin (overrides config)
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,

    /// Apply pending schema migrations and print the schema version
    Migrate,

    /// Print aggregate task statistics as JSON
    Stats,
}

impl Cli {
    /// The subcommand to run, defaulting to `serve`.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(ref db_path) = self.database {
            config.server.db_path = db_path.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref origin) = self.origin {
            config.cors.allowed_origin = origin.clone();
        }
        config
    }
}
