//! Explain command implementation

use std::path::Path;

use anyhow::Result;
use skew_core::{explain_account, narrate_root_cause, AnalysisConfig, NarrativeClient};
use tracing::warn;

use super::{load_transactions, truncate};

pub async fn cmd_explain(
    account: u32,
    current: &Path,
    prior: &Path,
    narrate: bool,
    config: &AnalysisConfig,
    json: bool,
) -> Result<()> {
    let current_txs = load_transactions(current)?;
    let prior_txs = load_transactions(prior)?;
    let mut result = explain_account(account, &prior_txs, &current_txs, config);

    if narrate {
        match NarrativeClient::from_env() {
            Some(client) => narrate_root_cause(&client, &mut result).await,
            None => warn!("No narrative backend configured; set OLLAMA_HOST or NARRATIVE_BACKEND=mock"),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("🔍 Root Cause: {} ({})", result.account, result.account_name);
    println!(
        "   Prior {:.2}, current {:.2}, change {:+.2} ({:+.1}%)",
        result.prior_total, result.current_total, result.delta_abs, result.delta_pct
    );
    println!("   Decomposition confidence {:.2}", result.confidence);

    if result.clusters.is_empty() {
        println!("   No booking-level clusters found.");
    } else {
        println!("   ─────────────────────────────────────────────────────────────");
        for cluster in &result.clusters {
            println!(
                "   {:16} │ {:>12.2} │ {:>6.1}% │ {:>3} bookings",
                cluster.kind.label(),
                cluster.amount,
                cluster.contribution_pct,
                cluster.transactions.len()
            );
        }
    }

    if !result.drivers.is_empty() {
        println!();
        println!("   Dimension drivers");
        for driver in &result.drivers {
            println!(
                "   {:14} {:20} │ {:>12.2} │ {:>12.2}",
                driver.dimension,
                truncate(&driver.key, 20),
                driver.prior_amount,
                driver.current_amount
            );
        }
    }

    if let Some(ref narrative) = result.narrative {
        println!();
        println!("📝 {}", narrative);
    }
    Ok(())
}
