//! Rollup command implementation

use std::path::Path;

use anyhow::Result;
use skew_core::models::Dimension;
use skew_core::rollup;

use super::{load_transactions, truncate};

pub fn cmd_rollup(file: &Path, dimension: &str, json: bool) -> Result<()> {
    let dimension: Dimension = dimension.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let transactions = load_transactions(file)?;
    let result = rollup(&transactions, dimension);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("📈 Rollup by {}", dimension);
    println!(
        "   {:20} │ {:>14} │ {:>14} │ {:>7} │ {:>6}",
        "Value", "Revenue", "DB V", "DB V %", "Count"
    );
    println!("   ─────────────────────┼────────────────┼────────────────┼─────────┼────────");
    for slice in &result.slices {
        if let Some(db5) = slice.levels.last() {
            println!(
                "   {:20} │ {:>14.2} │ {:>14.2} │ {:>6.1}% │ {:>6}",
                truncate(&slice.key, 20),
                slice.revenue,
                db5.amount,
                db5.pct_of_revenue,
                slice.booking_count
            );
        }
    }
    Ok(())
}
