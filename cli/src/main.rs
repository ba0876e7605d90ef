// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Caseflow CLI
//!
//! The `caseflow` binary runs the server and talks to it.
//!
//! ## Commands
//!
//! - `caseflow serve` - Serve the REST API until Ctrl+C / SIGTERM
//! - `caseflow config show|validate|generate` - Configuration management
//! - `caseflow case list|get|create|abandon` - Case operations
//! - `caseflow task mine|group|claim|decide` - Task operations
//! - `caseflow audit <case>` - Audit trail of a case

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use caseflow_cli::client::CaseflowClient;
use caseflow_cli::commands::{self, CaseCommand, ConfigCommand, TaskCommand};
use caseflow_cli::server;
use caseflow_core::domain::config::CaseflowConfig;

/// Caseflow - compliance case lifecycle engine
#[derive(Parser)]
#[command(name = "caseflow")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "CASEFLOW_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL of the Caseflow server for client commands
    #[arg(long, global = true, env = "CASEFLOW_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Acting user for client commands
    #[arg(short, long, global = true, env = "CASEFLOW_USER", default_value = "")]
    user: String,

    /// Log level (trace, debug, info, warn, error); defaults to the config file's level
    #[arg(long, global = true, env = "CASEFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    #[command(name = "serve")]
    Serve,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Case operations
    #[command(name = "case")]
    Case {
        #[command(subcommand)]
        command: CaseCommand,
    },

    /// Task operations
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Show the audit trail of a case
    #[command(name = "audit")]
    Audit {
        /// Case id or case number
        #[arg(value_name = "CASE")]
        case: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => {
            let config = CaseflowConfig::load_or_default(cli.config).context("Failed to load configuration")?;
            let observability = &config.spec.observability;
            init_logging(
                cli.log_level.as_deref().unwrap_or(&observability.log_level),
                &observability.log_format,
            )?;
            server::run(config).await
        }
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Case { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            let client = connect(&cli.server, &cli.user)?;
            commands::case::handle_command(command, &client).await
        }
        Some(Commands::Task { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            let client = connect(&cli.server, &cli.user)?;
            commands::task::handle_command(command, &client, &cli.user).await
        }
        Some(Commands::Audit { case }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), "compact")?;
            let client = connect(&cli.server, &cli.user)?;
            commands::audit::show(&client, &case).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

fn connect(server: &str, user: &str) -> Result<CaseflowClient> {
    if user.trim().is_empty() {
        anyhow::bail!("No acting user: pass --user or set CASEFLOW_USER");
    }
    Ok(CaseflowClient::new(server, user)?)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
