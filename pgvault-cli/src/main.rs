//! # PgVault CLI
//!
//! Operator command line for tenant payment-gateway configuration.
//!
//! - Key management (generate keys, re-encrypt stored credentials)
//! - Live connection tests against stored configurations
//! - Configuration checks
//! - Running the HTTP API

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{configuration, keys, serve, settings};

/// PgVault - tenant payment-gateway configuration
#[derive(Parser)]
#[command(name = "pgvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (.yaml, .toml or .json)
    #[arg(short, long, global = true, env = "PGVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Re-encrypt stored credentials under the active key version
    Rotate(keys::RotateArgs),

    /// Generate base64-encoded encryption keys
    Keygen(keys::KeygenArgs),

    /// Run a live connection test for a stored configuration
    TestConnection(configuration::TestConnectionArgs),

    /// Configuration file commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Run the HTTP API
    Serve,

    /// Show system information
    Info,
}

/// Configuration file subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration and print a summary
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = settings::load(cli.config.as_deref())?;
    let _guards = settings::setup_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Rotate(args) => keys::rotate(&config, &args).await?,
        Commands::Keygen(args) => keys::keygen(&args)?,
        Commands::TestConnection(args) => configuration::test_connection(&config, &args).await?,
        Commands::Config(ConfigCommands::Check) => configuration::check(&config)?,
        Commands::Serve => serve::run(&config).await?,
        Commands::Info => configuration::info(&config),
    }

    Ok(())
}
