//! Variance command implementation

use std::path::Path;

use anyhow::Result;
use skew_core::models::{DeviationStatus, TrafficLight, Transaction};
use skew_core::{compare_periods, reconcile, AnalysisConfig};

use super::{load_plan, load_transactions, truncate};

pub fn cmd_variance(
    actual: &Path,
    prior: &Path,
    plan: Option<&Path>,
    cost_centers: bool,
    config: &AnalysisConfig,
    json: bool,
) -> Result<()> {
    let actual_txs = load_transactions(actual)?;
    let prior_txs = load_transactions(prior)?;

    // no plan table: plain two-period comparison
    let Some(plan) = plan else {
        return cmd_compare(&prior_txs, &actual_txs, config, json);
    };
    let plan = load_plan(plan)?;
    let report = reconcile(&prior_txs, &plan, &actual_txs, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let s = &report.summary;
    println!();
    println!("📊 Plan/Actual Variance");
    println!(
        "   Prior year {:.2} │ Plan {:.2} │ Actual {:.2}",
        s.prior_year_total, s.plan_total, s.actual_total
    );
    println!(
        "   Plan achievement {:.1}%   🟢 {}  🟡 {}  🔴 {}",
        s.plan_achievement_pct, s.green, s.yellow, s.red
    );

    if report.accounts.is_empty() {
        println!("   No material deviations.");
        return Ok(());
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:6} {:22} │ {:>12} │ {:>12} │ {:>8} │ {}",
        "Konto", "Name", "Plan", "Actual", "Δ Plan", "Status"
    );
    println!("   ─────────────────────────────┼──────────────┼──────────────┼──────────┼────────");
    for account in &report.accounts {
        println!(
            "   {:6} {:22} │ {:>12.2} │ {:>12.2} │ {:>+7.1}% │ {} {}",
            account.account,
            truncate(&account.account_name, 22),
            account.plan_amount,
            account.actual_amount,
            account.plan_delta_pct,
            status_icon(account.status),
            account.status
        );
    }

    if cost_centers && !report.cost_centers.is_empty() {
        println!();
        println!("🏢 Cost Centers");
        println!(
            "   {:16} │ {:>12} │ {:>12} │ {:>8} │ {}",
            "Cost center", "Plan", "Actual", "Δ Plan", "Status"
        );
        for cc in &report.cost_centers {
            println!(
                "   {:16} │ {:>12.2} │ {:>12.2} │ {:>+7.1}% │ {} {}",
                truncate(&cc.cost_center, 16),
                cc.plan_amount,
                cc.actual_amount,
                cc.plan_delta_pct,
                status_icon(cc.status),
                cc.status
            );
            for contribution in &cc.top_accounts {
                println!(
                    "     {:14} │ {:>12.2} │ {:>12.2} │ Δ {:.2}",
                    truncate(&contribution.account_name, 14),
                    contribution.plan_amount,
                    contribution.actual_amount,
                    contribution.delta_abs
                );
            }
        }
    }
    Ok(())
}

fn cmd_compare(
    prior: &[Transaction],
    actual: &[Transaction],
    config: &AnalysisConfig,
    json: bool,
) -> Result<()> {
    let deviations = compare_periods(prior, actual, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&deviations)?);
        return Ok(());
    }

    println!();
    println!("📊 Period Comparison");
    if deviations.is_empty() {
        println!("   No material deviations.");
        return Ok(());
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:6} {:22} │ {:>12} │ {:>12} │ {:>8} │ {}",
        "Konto", "Name", "Prior", "Current", "Δ", "Tag"
    );
    println!("   ─────────────────────────────┼──────────────┼──────────────┼──────────┼──────");
    for dev in &deviations {
        println!(
            "   {:6} {:22} │ {:>12.2} │ {:>12.2} │ {:>+7.1}% │ {}",
            dev.account,
            truncate(&dev.account_name, 22),
            dev.prior_amount,
            dev.current_amount,
            dev.delta_pct,
            dev.anomaly.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn status_icon(status: DeviationStatus) -> &'static str {
    match status.traffic_light() {
        TrafficLight::Green => "🟢",
        TrafficLight::Yellow => "🟡",
        TrafficLight::Red => "🔴",
    }
}
