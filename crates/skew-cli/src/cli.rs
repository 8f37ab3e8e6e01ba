//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Skew - Deviation and root-cause analytics for controlling data
#[derive(Parser)]
#[command(name = "skew")]
#[command(about = "Deviation and root-cause analytics for controlling exports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Analysis config TOML (thresholds, status bands, dimension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Override the absolute materiality floor
    #[arg(long, global = true)]
    pub min_abs: Option<f64>,

    /// Override the percentage materiality floor
    #[arg(long, global = true)]
    pub min_pct: Option<f64>,

    /// Override the yellow status band in percent
    #[arg(long, global = true)]
    pub yellow: Option<f64>,

    /// Override the red status band in percent
    #[arg(long, global = true)]
    pub red: Option<f64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Contribution margin cascade (DB I through DB V) for one period
    Margin {
        /// Transaction export CSV
        #[arg(short, long)]
        file: PathBuf,

        /// Dimension for the margin spread insight (overrides config)
        #[arg(short, long)]
        dimension: Option<String>,
    },

    /// Three-way variance: prior year vs plan vs actual. Without a plan
    /// table the two periods are compared directly.
    Variance {
        /// Actual period transaction CSV
        #[arg(short, long)]
        actual: PathBuf,

        /// Prior-year period transaction CSV
        #[arg(short, long)]
        prior: PathBuf,

        /// Plan table (semicolon, tab or comma delimited; German or
        /// English headers). Without it the prior year stands in as plan.
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Include the cost-center grain in the output
        #[arg(long)]
        cost_centers: bool,
    },

    /// Root-cause clustering for one account's change
    Explain {
        /// Account number to explain
        account: u32,

        /// Current period transaction CSV
        #[arg(short, long)]
        current: PathBuf,

        /// Prior period transaction CSV
        #[arg(short, long)]
        prior: PathBuf,

        /// Attach a prose narrative from the configured local model
        #[arg(long)]
        narrate: bool,
    },

    /// Revenue and margin cascade per dimension value
    Rollup {
        /// Transaction export CSV
        #[arg(short, long)]
        file: PathBuf,

        /// Dimension: account, cost-center, profit-center, counterparty
        #[arg(short, long, default_value = "cost-center")]
        dimension: String,
    },
}
