//! Two-period and three-way (prior year / plan / actual) reconciliation

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::aggregate::{self, UNASSIGNED_KEY};
use crate::classify::{classify_status, delta, is_expense_account, is_material, round1, round2, Delta};
use crate::config::AnalysisConfig;
use crate::models::{
    AccountContribution, AccountDeviation, CostCenterDeviation, DeviationStatus, Dimension,
    PlanTable, TrafficLight, Transaction, TripleAccountDeviation, VarianceReport, VarianceSummary,
};

const TOP_ACCOUNTS_PER_COST_CENTER: usize = 3;

/// Materiality-filtered deviations between two periods, largest absolute
/// deviation first.
pub fn compare_periods(
    prior: &[Transaction],
    current: &[Transaction],
    config: &AnalysisConfig,
) -> Vec<AccountDeviation> {
    let prior_groups = aggregate::group_by_account(prior);
    let current_groups = aggregate::group_by_account(current);
    let names = account_names(prior, current, None);

    let accounts: BTreeSet<u32> = prior_groups
        .keys()
        .chain(current_groups.keys())
        .copied()
        .collect();

    let mut deviations = Vec::new();
    for account in accounts {
        let p = prior_groups.get(&account).copied().unwrap_or_default();
        let c = current_groups.get(&account).copied().unwrap_or_default();
        let d = delta(p.signed, c.signed);
        if !is_material(&d, config) {
            continue;
        }
        let name = display_name(&names, account);
        deviations.push(AccountDeviation {
            account,
            account_name: name.clone(),
            prior_amount: round2(p.signed),
            current_amount: round2(c.signed),
            delta_abs: round2(d.abs),
            delta_pct: round1(d.pct),
            prior_count: p.count,
            current_count: c.count,
            top_transactions: top_transactions(current, account, config.top_transactions),
            comment: period_comment(&name, p.signed, c.signed, &d),
            anomaly: tag_anomaly(p.signed, c.signed, &d, config),
        });
    }
    deviations.sort_by(|a, b| {
        b.delta_abs
            .abs()
            .partial_cmp(&a.delta_abs.abs())
            .unwrap_or(Ordering::Equal)
    });

    debug!(reported = deviations.len(), "two-period comparison complete");
    deviations
}

/// Three-way reconciliation across prior year, plan and actual.
///
/// Account keys are the union of all three sources; accounts without a plan
/// entry fall back to their prior-year sum. An account is reported when the
/// plan comparison or the prior-year comparison clears the materiality gate.
pub fn reconcile(
    prior_year: &[Transaction],
    plan: &PlanTable,
    actual: &[Transaction],
    config: &AnalysisConfig,
) -> VarianceReport {
    let vj_groups = aggregate::group_by_account(prior_year);
    let ist_groups = aggregate::group_by_account(actual);
    let names = account_names(prior_year, actual, Some(plan));

    let accounts: BTreeSet<u32> = vj_groups
        .keys()
        .chain(ist_groups.keys())
        .copied()
        .chain(plan.accounts())
        .collect();

    // plan per account with the prior-year fallback applied
    let resolved_plan: BTreeMap<u32, f64> = accounts
        .iter()
        .map(|&account| {
            let vj = vj_groups.get(&account).map(|g| g.signed).unwrap_or(0.0);
            (account, plan.amount(account).unwrap_or(vj))
        })
        .collect();

    let mut report_accounts = Vec::new();
    let (mut green, mut yellow, mut red) = (0usize, 0usize, 0usize);
    let (mut total_vj, mut total_plan, mut total_ist) = (0.0f64, 0.0f64, 0.0f64);

    for &account in &accounts {
        let vj = vj_groups.get(&account).map(|g| g.signed).unwrap_or(0.0);
        let ist = ist_groups.get(&account).map(|g| g.signed).unwrap_or(0.0);
        let plan_amount = plan.amount(account).unwrap_or(vj);
        total_vj += vj;
        total_plan += plan_amount;
        total_ist += ist;

        let plan_delta = delta(plan_amount, ist);
        let prior_delta = delta(vj, ist);
        if !is_material(&plan_delta, config) && !is_material(&prior_delta, config) {
            continue;
        }
        let plan_vs_prior = delta(vj, plan_amount);
        let status = status_for(&plan_delta, is_expense_account(account, config), config);
        match status.traffic_light() {
            TrafficLight::Green => green += 1,
            TrafficLight::Yellow => yellow += 1,
            TrafficLight::Red => red += 1,
        }

        let name = display_name(&names, account);
        report_accounts.push(TripleAccountDeviation {
            account,
            account_name: name,
            prior_year_amount: round2(vj),
            plan_amount: round2(plan_amount),
            actual_amount: round2(ist),
            plan_delta_abs: round2(plan_delta.abs),
            plan_delta_pct: round1(plan_delta.pct),
            prior_delta_abs: round2(prior_delta.abs),
            prior_delta_pct: round1(prior_delta.pct),
            plan_vs_prior_abs: round2(plan_vs_prior.abs),
            plan_vs_prior_pct: round1(plan_vs_prior.pct),
            status,
            comment: triple_comment(ist, plan_amount, vj, &plan_delta, &prior_delta),
            top_transactions: top_transactions(actual, account, config.top_transactions),
        });
    }
    report_accounts.sort_by(|a, b| {
        b.plan_delta_abs
            .abs()
            .partial_cmp(&a.plan_delta_abs.abs())
            .unwrap_or(Ordering::Equal)
    });

    let cost_centers =
        reconcile_cost_centers(prior_year, actual, &resolved_plan, &names, config);

    let summary = VarianceSummary {
        green,
        yellow,
        red,
        prior_year_total: round2(total_vj),
        plan_total: round2(total_plan),
        actual_total: round2(total_ist),
        plan_delta_total: round2(total_ist - total_plan),
        plan_achievement_pct: if total_plan == 0.0 {
            100.0
        } else {
            round1(total_ist / total_plan * 100.0)
        },
    };

    debug!(
        accounts = report_accounts.len(),
        cost_centers = cost_centers.len(),
        "three-way reconciliation complete"
    );
    VarianceReport {
        accounts: report_accounts,
        cost_centers,
        summary,
    }
}

/// Cost-center grain of the three-way reconciliation.
///
/// The plan table is account-grained, so each account's plan is spread over
/// the cost centers it books into, weighted by actual booking magnitude
/// (prior-year magnitude when an account has no actual bookings, unassigned
/// when it has none at all). The spread keeps the cost-center plan column
/// summing to the account-level plan total.
fn reconcile_cost_centers(
    prior_year: &[Transaction],
    actual: &[Transaction],
    resolved_plan: &BTreeMap<u32, f64>,
    names: &BTreeMap<u32, String>,
    config: &AnalysisConfig,
) -> Vec<CostCenterDeviation> {
    #[derive(Default, Clone, Copy)]
    struct ThreeWay {
        vj: f64,
        plan: f64,
        ist: f64,
    }

    let ist_shares = magnitude_by_cost_center(actual);
    let vj_shares = magnitude_by_cost_center(prior_year);

    let mut cells: BTreeMap<String, BTreeMap<u32, ThreeWay>> = BTreeMap::new();
    for tx in actual {
        let key = aggregate::dimension_key(tx, Dimension::CostCenter);
        cells.entry(key).or_default().entry(tx.account).or_default().ist += tx.amount;
    }
    for tx in prior_year {
        let key = aggregate::dimension_key(tx, Dimension::CostCenter);
        cells.entry(key).or_default().entry(tx.account).or_default().vj += tx.amount;
    }
    for (&account, &plan_amount) in resolved_plan {
        let shares = normalized_shares(ist_shares.get(&account))
            .or_else(|| normalized_shares(vj_shares.get(&account)))
            .unwrap_or_else(|| vec![(UNASSIGNED_KEY.to_string(), 1.0)]);
        for (cost_center, share) in shares {
            cells
                .entry(cost_center)
                .or_default()
                .entry(account)
                .or_default()
                .plan += plan_amount * share;
        }
    }

    // favorability per cost center follows the dominant account side
    let mut magnitudes: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for tx in actual.iter().chain(prior_year) {
        let key = aggregate::dimension_key(tx, Dimension::CostCenter);
        let slot = magnitudes.entry(key).or_default();
        slot.1 += tx.amount.abs();
        if is_expense_account(tx.account, config) {
            slot.0 += tx.amount.abs();
        }
    }

    let mut out = Vec::new();
    for (cost_center, accounts) in cells {
        let vj: f64 = accounts.values().map(|c| c.vj).sum();
        let plan: f64 = accounts.values().map(|c| c.plan).sum();
        let ist: f64 = accounts.values().map(|c| c.ist).sum();

        let plan_delta = delta(plan, ist);
        let prior_delta = delta(vj, ist);
        if !is_material(&plan_delta, config) && !is_material(&prior_delta, config) {
            continue;
        }

        let (expense_mag, total_mag) = magnitudes.get(&cost_center).copied().unwrap_or((0.0, 0.0));
        let is_expense = total_mag == 0.0 || expense_mag * 2.0 >= total_mag;
        let status = status_for(&plan_delta, is_expense, config);

        let mut top_accounts: Vec<AccountContribution> = accounts
            .iter()
            .map(|(&account, cell)| AccountContribution {
                account,
                account_name: display_name(names, account),
                plan_amount: round2(cell.plan),
                actual_amount: round2(cell.ist),
                delta_abs: round2(cell.ist - cell.plan),
            })
            .collect();
        top_accounts.sort_by(|a, b| {
            b.delta_abs
                .abs()
                .partial_cmp(&a.delta_abs.abs())
                .unwrap_or(Ordering::Equal)
        });
        top_accounts.truncate(TOP_ACCOUNTS_PER_COST_CENTER);

        out.push(CostCenterDeviation {
            cost_center,
            prior_year_amount: round2(vj),
            plan_amount: round2(plan),
            actual_amount: round2(ist),
            plan_delta_abs: round2(plan_delta.abs),
            plan_delta_pct: round1(plan_delta.pct),
            prior_delta_abs: round2(prior_delta.abs),
            prior_delta_pct: round1(prior_delta.pct),
            status,
            top_accounts,
        });
    }
    out.sort_by(|a, b| {
        b.plan_delta_abs
            .abs()
            .partial_cmp(&a.plan_delta_abs.abs())
            .unwrap_or(Ordering::Equal)
    });
    out
}

/// Ledger sums keep revenue negative (credit convention), so the percentage
/// is oriented to its magnitude reading before the favorability check.
fn status_for(d: &Delta, is_expense: bool, config: &AnalysisConfig) -> DeviationStatus {
    let oriented = if is_expense { d.pct } else { -d.pct };
    classify_status(oriented, is_expense, config)
}

fn magnitude_by_cost_center(transactions: &[Transaction]) -> BTreeMap<u32, BTreeMap<String, f64>> {
    let mut mags: BTreeMap<u32, BTreeMap<String, f64>> = BTreeMap::new();
    for tx in transactions {
        let key = aggregate::dimension_key(tx, Dimension::CostCenter);
        *mags.entry(tx.account).or_default().entry(key).or_default() += tx.amount.abs();
    }
    mags
}

fn normalized_shares(mags: Option<&BTreeMap<String, f64>>) -> Option<Vec<(String, f64)>> {
    let mags = mags?;
    let total: f64 = mags.values().sum();
    if total == 0.0 {
        return None;
    }
    Some(mags.iter().map(|(k, v)| (k.clone(), v / total)).collect())
}

fn account_names(
    prior: &[Transaction],
    current: &[Transaction],
    plan: Option<&PlanTable>,
) -> BTreeMap<u32, String> {
    let mut names = BTreeMap::new();
    for tx in current.iter().chain(prior) {
        if !tx.account_name.is_empty() {
            names
                .entry(tx.account)
                .or_insert_with(|| tx.account_name.clone());
        }
    }
    if let Some(plan) = plan {
        for account in plan.accounts() {
            if let Some(name) = plan.get(account).and_then(|e| e.name.clone()) {
                names.entry(account).or_insert(name);
            }
        }
    }
    names
}

fn display_name(names: &BTreeMap<u32, String>, account: u32) -> String {
    names
        .get(&account)
        .cloned()
        .unwrap_or_else(|| format!("Account {account}"))
}

fn top_transactions(transactions: &[Transaction], account: u32, n: usize) -> Vec<Transaction> {
    let mut list: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.account == account)
        .cloned()
        .collect();
    list.sort_by(|a, b| {
        b.amount
            .abs()
            .partial_cmp(&a.amount.abs())
            .unwrap_or(Ordering::Equal)
    });
    list.truncate(n);
    list
}

fn period_comment(name: &str, prior: f64, current: f64, d: &Delta) -> String {
    let direction = if d.abs >= 0.0 { "rose" } else { "fell" };
    format!(
        "{} {} from {:.2} to {:.2}, a change of {:.2} ({:+.1}%).",
        name,
        direction,
        prior,
        current,
        d.abs.abs(),
        d.pct
    )
}

/// Two sentences, plan comparison first, prior-year comparison second.
fn triple_comment(ist: f64, plan: f64, vj: f64, plan_delta: &Delta, prior_delta: &Delta) -> String {
    let first = if plan_delta.abs > 0.0 {
        format!(
            "Actual of {:.2} exceeds plan of {:.2} by {:.2} ({:+.1}%).",
            ist,
            plan,
            plan_delta.abs,
            plan_delta.pct
        )
    } else if plan_delta.abs < 0.0 {
        format!(
            "Actual of {:.2} falls short of plan of {:.2} by {:.2} ({:+.1}%).",
            ist,
            plan,
            plan_delta.abs.abs(),
            plan_delta.pct
        )
    } else {
        format!("Actual of {:.2} matches plan.", ist)
    };
    let second = if prior_delta.abs > 0.0 {
        format!(
            "Against prior year ({:.2}) the value rose by {:.2} ({:+.1}%).",
            vj,
            prior_delta.abs,
            prior_delta.pct
        )
    } else if prior_delta.abs < 0.0 {
        format!(
            "Against prior year ({:.2}) the value fell by {:.2} ({:+.1}%).",
            vj,
            prior_delta.abs.abs(),
            prior_delta.pct
        )
    } else {
        format!("Prior year was level at {:.2}.", vj)
    };
    format!("{first} {second}")
}

fn tag_anomaly(prior: f64, current: f64, d: &Delta, config: &AnalysisConfig) -> Option<String> {
    if prior == 0.0 && current != 0.0 {
        return Some("new_position".to_string());
    }
    if current == 0.0 && prior != 0.0 {
        return Some("discontinued".to_string());
    }
    if d.pct.abs() >= config.red_pct * 2.0 {
        return Some("spike".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviationStatus, PlanEntry};
    use chrono::NaiveDate;

    fn tx(account: u32, amount: f64, name: &str, cost_center: Option<&str>) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            amount,
            account,
            account_name: name.to_string(),
            cost_center: cost_center.map(String::from),
            profit_center: None,
            document_no: "B-7".into(),
            description: "posting".into(),
            counterparty: None,
        }
    }

    fn plan_of(entries: &[(u32, f64)]) -> PlanTable {
        let mut plan = PlanTable::new();
        for &(account, amount) in entries {
            plan.insert(PlanEntry {
                account,
                name: None,
                amount,
            });
        }
        plan
    }

    #[test]
    fn reference_triple_deviation() {
        // expense account: prior year 20k, plan 22k, actual 30k
        let prior = vec![tx(6820, 20_000.0, "IT-Kosten", None)];
        let actual = vec![
            tx(6820, 18_000.0, "IT-Kosten", None),
            tx(6820, 12_000.0, "IT-Kosten", None),
        ];
        let plan = plan_of(&[(6820, 22_000.0)]);

        let report = reconcile(&prior, &plan, &actual, &AnalysisConfig::default());
        assert_eq!(report.accounts.len(), 1);
        let dev = &report.accounts[0];
        assert_eq!(dev.plan_delta_abs, 8_000.0);
        assert_eq!(dev.plan_delta_pct, 36.4);
        assert_eq!(dev.prior_delta_abs, 10_000.0);
        assert_eq!(dev.prior_delta_pct, 50.0);
        assert_eq!(dev.status, DeviationStatus::Critical);
        assert_eq!(dev.top_transactions.len(), 2);
        assert_eq!(dev.top_transactions[0].amount, 18_000.0);
        assert!(dev.comment.starts_with("Actual of 30000.00 exceeds plan of 22000.00 by 8000.00 (+36.4%)."));
        assert!(dev.comment.contains("Against prior year (20000.00) the value rose by 10000.00 (+50.0%)."));
        assert_eq!(report.summary.red, 1);
    }

    #[test]
    fn missing_plan_falls_back_to_prior_year() {
        let prior = vec![tx(6300, 100_000.0, "Fremdleistungen", None)];
        let actual = vec![tx(6300, 120_000.0, "Fremdleistungen", None)];
        let report = reconcile(&prior, &PlanTable::new(), &actual, &AnalysisConfig::default());

        let dev = &report.accounts[0];
        assert_eq!(dev.plan_amount, 100_000.0);
        assert_eq!(dev.plan_delta_abs, 20_000.0);
        assert_eq!(dev.plan_vs_prior_abs, 0.0);
    }

    #[test]
    fn either_comparison_can_make_an_account_material() {
        // near-plan, but far off prior year
        let prior = vec![tx(6820, 20_000.0, "IT-Kosten", None)];
        let actual = vec![tx(6820, 30_500.0, "IT-Kosten", None)];
        let plan = plan_of(&[(6820, 30_000.0)]);

        let report = reconcile(&prior, &plan, &actual, &AnalysisConfig::default());
        assert_eq!(report.accounts.len(), 1);
        let dev = &report.accounts[0];
        // status still follows the (small) plan deviation
        assert_eq!(dev.status, DeviationStatus::OnTrack);
        assert_eq!(report.summary.green, 1);
    }

    #[test]
    fn materiality_needs_both_legs_per_comparison() {
        // 4k / 20%: absolute leg fails. 10k / 2%: percentage leg fails.
        // 6k / 6%: both pass. prior year pinned to actual so only the plan
        // comparison decides.
        let actual = vec![
            tx(6100, 24_000.0, "Löhne", None),
            tx(6200, 510_000.0, "Gehälter", None),
            tx(6300, 106_000.0, "Fremdleistungen", None),
        ];
        let prior = actual.clone();
        let plan = plan_of(&[(6100, 20_000.0), (6200, 500_000.0), (6300, 100_000.0)]);

        let report = reconcile(&prior, &plan, &actual, &AnalysisConfig::default());
        assert_eq!(report.accounts.len(), 1);
        assert_eq!(report.accounts[0].account, 6300);
        assert_eq!(report.accounts[0].plan_delta_abs, 6_000.0);
    }

    #[test]
    fn revenue_status_follows_favorability_under_credit_convention() {
        let config = AnalysisConfig::default();
        let plan = plan_of(&[(4400, -580_000.0)]);

        // shortfall: less credit than planned is unfavorable
        let short = vec![tx(4400, -540_000.0, "Umsatzerlöse", None)];
        let report = reconcile(&[], &plan, &short, &config);
        assert_eq!(report.accounts[0].status, DeviationStatus::OverPlan);

        // upside: more credit than planned is favorable
        let upside = vec![tx(4400, -620_000.0, "Umsatzerlöse", None)];
        let report = reconcile(&[], &plan, &upside, &config);
        assert_eq!(report.accounts[0].status, DeviationStatus::UnderPlan);
    }

    #[test]
    fn unconsumed_plan_only_accounts_are_reported() {
        let mut plan = plan_of(&[(6900, 5_000.0)]);
        plan.insert(PlanEntry {
            account: 6900,
            name: Some("Schulungen".into()),
            amount: 5_000.0,
        });
        let report = reconcile(&[], &plan, &[], &AnalysisConfig::default());

        assert_eq!(report.accounts.len(), 1);
        let dev = &report.accounts[0];
        assert_eq!(dev.account_name, "Schulungen");
        assert_eq!(dev.plan_amount, 5_000.0);
        assert_eq!(dev.actual_amount, 0.0);
        assert_eq!(dev.plan_delta_abs, -5_000.0);
        assert_eq!(dev.plan_delta_pct, -100.0);
        assert_eq!(dev.status, DeviationStatus::Critical);
    }

    #[test]
    fn accounts_sort_by_absolute_plan_deviation() {
        let actual = vec![
            tx(6100, 50_000.0, "Löhne", None),
            tx(6300, 90_000.0, "Fremdleistungen", None),
        ];
        let plan = plan_of(&[(6100, 40_000.0), (6300, 110_000.0)]);
        let report = reconcile(&[], &plan, &actual, &AnalysisConfig::default());

        assert_eq!(report.accounts.len(), 2);
        assert_eq!(report.accounts[0].account, 6300);
        assert_eq!(report.accounts[0].plan_delta_abs, -20_000.0);
        assert_eq!(report.accounts[1].plan_delta_abs, 10_000.0);
    }

    #[test]
    fn cost_center_plan_is_apportioned_by_actual_share() {
        let actual = vec![
            tx(6820, 30_000.0, "IT-Kosten", Some("VERW")),
            tx(6820, 10_000.0, "IT-Kosten", Some("IT")),
        ];
        let plan = plan_of(&[(6820, 8_000.0)]);
        let report = reconcile(&[], &plan, &actual, &AnalysisConfig::default());

        assert_eq!(report.cost_centers.len(), 2);
        let verw = report
            .cost_centers
            .iter()
            .find(|c| c.cost_center == "VERW")
            .expect("VERW cost center");
        assert_eq!(verw.plan_amount, 6_000.0);
        assert_eq!(verw.actual_amount, 30_000.0);
        assert_eq!(verw.plan_delta_abs, 24_000.0);
        assert_eq!(verw.status, DeviationStatus::Critical);
        assert_eq!(verw.top_accounts.len(), 1);
        assert_eq!(verw.top_accounts[0].account, 6820);

        // the apportioned plan closes against the account-level plan
        let spread_total: f64 = report.cost_centers.iter().map(|c| c.plan_amount).sum();
        assert!((spread_total - 8_000.0).abs() < 0.01);
    }

    #[test]
    fn plan_only_accounts_land_in_the_unassigned_bucket() {
        let plan = plan_of(&[(6900, 8_000.0)]);
        let report = reconcile(&[], &plan, &[], &AnalysisConfig::default());

        assert_eq!(report.cost_centers.len(), 1);
        assert_eq!(report.cost_centers[0].cost_center, UNASSIGNED_KEY);
        assert_eq!(report.cost_centers[0].plan_amount, 8_000.0);
    }

    #[test]
    fn summary_totals_cover_all_accounts_not_just_reported() {
        let actual = vec![
            tx(6100, 50_000.0, "Löhne", None),
            // immaterial against its flat plan
            tx(6820, 1_000.0, "IT-Kosten", None),
        ];
        let prior = vec![
            tx(6100, 40_000.0, "Löhne", None),
            tx(6820, 1_000.0, "IT-Kosten", None),
        ];
        let report = reconcile(&prior, &PlanTable::new(), &actual, &AnalysisConfig::default());

        assert_eq!(report.accounts.len(), 1);
        assert_eq!(report.summary.prior_year_total, 41_000.0);
        assert_eq!(report.summary.plan_total, 41_000.0);
        assert_eq!(report.summary.actual_total, 51_000.0);
        assert_eq!(report.summary.plan_delta_total, 10_000.0);
        assert_eq!(report.summary.plan_achievement_pct, 124.4);
    }

    #[test]
    fn plan_achievement_defaults_to_hundred_on_zero_plan() {
        let report = reconcile(&[], &PlanTable::new(), &[], &AnalysisConfig::default());
        assert_eq!(report.summary.plan_achievement_pct, 100.0);
        assert!(report.accounts.is_empty());
        assert!(report.cost_centers.is_empty());
    }

    #[test]
    fn two_period_comparison_ranks_by_absolute_delta() {
        let prior = vec![
            tx(6100, 40_000.0, "Löhne", None),
            tx(6300, 100_000.0, "Fremdleistungen", None),
        ];
        let current = vec![
            tx(6100, 50_000.0, "Löhne", None),
            tx(6300, 130_000.0, "Fremdleistungen", None),
        ];
        let deviations = compare_periods(&prior, &current, &AnalysisConfig::default());

        assert_eq!(deviations.len(), 2);
        assert_eq!(deviations[0].account, 6300);
        assert_eq!(deviations[0].delta_abs, 30_000.0);
        assert_eq!(deviations[1].account, 6100);
        assert!(deviations[1].comment.contains("rose from 40000.00 to 50000.00"));
    }

    #[test]
    fn anomaly_tags_cover_new_discontinued_and_spike() {
        // percentage leg set to zero so zero-prior positions pass the gate
        let config = AnalysisConfig::default().with_materiality(5_000.0, 0.0);
        let prior = vec![
            tx(6300, 80_000.0, "Fremdleistungen", None),
            tx(6400, 30_000.0, "Wartung", None),
        ];
        let current = vec![
            tx(6300, 110_000.0, "Fremdleistungen", None),
            tx(6500, 25_000.0, "Leasing", None),
        ];
        let deviations = compare_periods(&prior, &current, &config);

        let by_account = |account: u32| {
            deviations
                .iter()
                .find(|d| d.account == account)
                .expect("deviation present")
        };
        assert_eq!(by_account(6500).anomaly.as_deref(), Some("new_position"));
        assert_eq!(by_account(6400).anomaly.as_deref(), Some("discontinued"));
        // 30k on 80k is 37.5%, beyond twice the red threshold
        assert_eq!(by_account(6300).anomaly.as_deref(), Some("spike"));
    }

    #[test]
    fn zero_prior_percentage_stays_zero_and_fails_the_gate() {
        let current = vec![tx(6500, 25_000.0, "Leasing", None)];
        let deviations = compare_periods(&[], &current, &AnalysisConfig::default());
        // delta_pct is 0 on a zero base, so the default 5% leg filters it
        assert!(deviations.is_empty());
    }
}
