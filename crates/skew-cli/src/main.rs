//! Skew CLI - Deviation and root-cause analytics for controlling exports
//!
//! Usage:
//!   skew margin --file ist.csv                         Margin cascade for one period
//!   skew variance --actual ist.csv --prior vj.csv --plan plan.csv
//!   skew explain 6300 --current ist.csv --prior vj.csv --narrate
//!   skew rollup --file ist.csv --dimension cost-center

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::resolve_config(&cli)?;

    match &cli.command {
        Commands::Margin { file, dimension } => {
            commands::cmd_margin(file, dimension.as_deref(), &config, cli.json)
        }
        Commands::Variance {
            actual,
            prior,
            plan,
            cost_centers,
        } => commands::cmd_variance(
            actual,
            prior,
            plan.as_deref(),
            *cost_centers,
            &config,
            cli.json,
        ),
        Commands::Explain {
            account,
            current,
            prior,
            narrate,
        } => commands::cmd_explain(*account, current, prior, *narrate, &config, cli.json).await,
        Commands::Rollup { file, dimension } => commands::cmd_rollup(file, dimension, cli.json),
    }
}
