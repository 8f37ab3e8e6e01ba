//! Margin command implementation

use std::path::Path;

use anyhow::Result;
use skew_core::models::{Dimension, RowKind};
use skew_core::{analyze, AnalysisConfig};

use super::{load_transactions, truncate};

pub fn cmd_margin(
    file: &Path,
    dimension: Option<&str>,
    config: &AnalysisConfig,
    json: bool,
) -> Result<()> {
    let config = match dimension {
        Some(raw) => {
            let dimension: Dimension = raw.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            config.clone().with_dimension(dimension)
        }
        None => config.clone(),
    };
    let transactions = load_transactions(file)?;
    let result = analyze(&transactions, &config);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("📊 Contribution Margin");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:33} │ {:>14} │ {:>7}", "Position", "Amount", "% Rev");
    println!("   ──────────────────────────────────┼────────────────┼─────────");
    for row in &result.rows {
        let label = match row.kind {
            RowKind::Margin => format!("= {}", row.label),
            RowKind::Category => row.label.clone(),
        };
        println!(
            "   {:33} │ {:>14.2} │ {:>6.1}%",
            truncate(&label, 33),
            row.amount,
            row.pct_of_revenue
        );
        for child in &row.children {
            let child_label = format!("  {} {}", child.account, child.account_name);
            println!(
                "   {:33} │ {:>14.2} │ {:>6.1}%",
                truncate(&child_label, 33),
                child.amount,
                child.pct_of_revenue
            );
        }
    }

    println!();
    println!("💡 Insights");
    for insight in &result.insights {
        println!("   • {}", insight);
    }
    Ok(())
}
