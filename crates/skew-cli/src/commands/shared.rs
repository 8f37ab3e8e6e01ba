//! Config resolution and export loading helpers

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use skew_core::models::{PlanTable, Transaction};
use skew_core::{parse_plan_table, parse_transactions_csv, AnalysisConfig};
use tracing::info;

use crate::cli::Cli;

/// Analysis config from `--config` (defaults when absent), with the
/// command-line threshold overrides applied on top.
pub fn resolve_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Cannot read config {}", path.display()))?;
            AnalysisConfig::from_toml(&raw)?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(abs) = cli.min_abs {
        config.materiality_abs = abs;
    }
    if let Some(pct) = cli.min_pct {
        config.materiality_pct = pct;
    }
    if let Some(yellow) = cli.yellow {
        config.yellow_pct = yellow;
    }
    if let Some(red) = cli.red {
        config.red_pct = red;
    }
    Ok(config)
}

pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open transaction export {}", path.display()))?;
    let transactions = parse_transactions_csv(file)
        .with_context(|| format!("Cannot parse transaction export {}", path.display()))?;
    info!(count = transactions.len(), file = %path.display(), "loaded transactions");
    Ok(transactions)
}

pub fn load_plan(path: &Path) -> Result<PlanTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read plan table {}", path.display()))?;
    let plan = parse_plan_table(&raw);
    info!(entries = plan.len(), file = %path.display(), "loaded plan table");
    Ok(plan)
}
