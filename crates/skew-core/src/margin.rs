//! Contribution margin decomposition (DB I through DB V)

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::aggregate::{self, CategoryTotals};
use crate::classify::{classify_account, round1, round2, safe_pct};
use crate::config::AnalysisConfig;
use crate::models::{
    AccountLine, ContributionResult, CostCategory, Dimension, DimensionRollup, DimensionSlice,
    MarginLevel, ReportRow, RowKind, Transaction, WaterfallKind, WaterfallStep,
};

const MARGIN_LABELS: [&str; 5] = ["DB I", "DB II", "DB III", "DB IV", "DB V"];
const MAX_INSIGHTS: usize = 6;

/// Full margin decomposition over one period's postings: cascade, waterfall
/// series, drill-down rows and rule-based insights. Empty input yields the
/// zeroed result with a single explanatory insight.
pub fn analyze(transactions: &[Transaction], config: &AnalysisConfig) -> ContributionResult {
    let totals = aggregate::category_totals(transactions);
    let raw = cascade_raw(&totals);
    let levels = cascade(&totals);
    let rows = build_rows(transactions, &totals, &levels, config);
    let waterfall = build_waterfall(&totals, &levels);
    let insights = if transactions.is_empty() {
        vec!["No postings in the period; nothing to decompose.".to_string()]
    } else {
        build_insights(&totals, &raw, transactions, config)
    };
    debug!(
        revenue = totals.revenue,
        insights = insights.len(),
        "margin analysis complete"
    );
    ContributionResult {
        revenue: round2(totals.revenue),
        levels,
        rows,
        waterfall,
        insights,
    }
}

fn cascade_raw(totals: &CategoryTotals) -> [f64; 5] {
    let mut out = [0.0; 5];
    let mut running = totals.revenue;
    for (idx, cost) in totals.cost_groups.iter().enumerate() {
        running -= cost;
        out[idx] = running;
    }
    out
}

/// DB(n) = DB(n-1) minus the n-th cost group, starting from revenue.
pub fn cascade(totals: &CategoryTotals) -> Vec<MarginLevel> {
    cascade_raw(totals)
        .iter()
        .zip(MARGIN_LABELS)
        .map(|(amount, label)| MarginLevel {
            label: label.to_string(),
            amount: round2(*amount),
            pct_of_revenue: round1(safe_pct(*amount, totals.revenue)),
        })
        .collect()
}

/// Alternating subtotal and floating delta bars: revenue, one delta per cost
/// group, one subtotal per margin level. Delta bars hang from the running
/// total so a chart can render them without recomputing.
fn build_waterfall(totals: &CategoryTotals, levels: &[MarginLevel]) -> Vec<WaterfallStep> {
    let mut steps = Vec::with_capacity(11);
    steps.push(WaterfallStep {
        label: CostCategory::Revenue.label().to_string(),
        kind: WaterfallKind::Subtotal,
        base: 0.0,
        value: round2(totals.revenue),
    });
    let mut running = totals.revenue;
    for (idx, category) in CostCategory::COST_GROUPS.iter().enumerate() {
        let cost = totals.cost_groups[idx];
        steps.push(WaterfallStep {
            label: category.label().to_string(),
            kind: WaterfallKind::Delta,
            base: round2(running),
            value: round2(-cost),
        });
        running -= cost;
        steps.push(WaterfallStep {
            label: levels[idx].label.clone(),
            kind: WaterfallKind::Subtotal,
            base: 0.0,
            value: levels[idx].amount,
        });
    }
    steps
}

fn build_rows(
    transactions: &[Transaction],
    totals: &CategoryTotals,
    levels: &[MarginLevel],
    config: &AnalysisConfig,
) -> Vec<ReportRow> {
    let mut names: BTreeMap<u32, &str> = BTreeMap::new();
    for tx in transactions {
        names.entry(tx.account).or_insert(tx.account_name.as_str());
    }

    // account amounts per category, measured like the row they sit under
    let mut per_category: BTreeMap<CostCategory, Vec<(u32, f64)>> = BTreeMap::new();
    for (account, group) in aggregate::group_by_account(transactions) {
        let category = classify_account(account);
        let amount = match category {
            CostCategory::Revenue => group.signed.abs(),
            _ => group.magnitude,
        };
        per_category.entry(category).or_default().push((account, amount));
    }

    let children = |category: CostCategory| -> Vec<AccountLine> {
        let mut accounts = per_category.get(&category).cloned().unwrap_or_default();
        accounts.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        accounts.truncate(config.top_accounts);
        accounts
            .into_iter()
            .map(|(account, amount)| AccountLine {
                account,
                account_name: names.get(&account).unwrap_or(&"").to_string(),
                amount: round2(amount),
                pct_of_revenue: round1(safe_pct(amount, totals.revenue)),
            })
            .collect()
    };

    let category_row = |category: CostCategory, amount: f64| ReportRow {
        label: category.label().to_string(),
        kind: RowKind::Category,
        amount: round2(amount),
        pct_of_revenue: round1(safe_pct(amount, totals.revenue)),
        children: children(category),
    };

    let mut rows = Vec::with_capacity(11);
    rows.push(category_row(CostCategory::Revenue, totals.revenue));
    for (idx, category) in CostCategory::COST_GROUPS.iter().enumerate() {
        rows.push(category_row(*category, totals.cost_groups[idx]));
        rows.push(ReportRow {
            label: levels[idx].label.clone(),
            kind: RowKind::Margin,
            amount: levels[idx].amount,
            pct_of_revenue: levels[idx].pct_of_revenue,
            children: Vec::new(),
        });
    }
    rows
}

/// The fixed insight battery. Rules run in a set order and each contributes
/// at most one finding, capped at six overall.
fn build_insights(
    totals: &CategoryTotals,
    raw: &[f64; 5],
    transactions: &[Transaction],
    config: &AnalysisConfig,
) -> Vec<String> {
    let revenue = totals.revenue;
    let db1_pct = safe_pct(raw[0], revenue);
    let db5_pct = safe_pct(raw[4], revenue);
    let personnel_pct = safe_pct(totals.cost_groups[1], revenue);
    let overhead_pct = safe_pct(totals.cost_groups[3], revenue);

    let mut insights = Vec::new();

    // 1: DB I tier
    if db1_pct >= 60.0 {
        insights.push(format!(
            "DB I margin of {:.1}% is strong; variable costs are well covered.",
            db1_pct
        ));
    } else if db1_pct >= 40.0 {
        insights.push(format!("DB I margin of {:.1}% is solid.", db1_pct));
    } else {
        insights.push(format!(
            "DB I margin of {:.1}% is weak; variable costs absorb most of the revenue.",
            db1_pct
        ));
    }

    // 2: personnel intensity
    if personnel_pct > 30.0 {
        insights.push(format!(
            "Personnel costs take {:.1}% of revenue, above the 30% mark.",
            personnel_pct
        ));
    }

    // 3: net margin
    if db5_pct < 0.0 {
        insights.push(format!(
            "Net margin is negative ({:.1}%); the period closes at a loss.",
            db5_pct
        ));
    } else if db5_pct < 3.0 {
        insights.push(format!(
            "Net margin of {:.1}% leaves little buffer below the 3% line.",
            db5_pct
        ));
    } else if db5_pct >= 10.0 {
        insights.push(format!("Net margin of {:.1}% is comfortable.", db5_pct));
    }

    // 4: overhead ratio
    if overhead_pct > 20.0 {
        insights.push(format!(
            "Overhead takes {:.1}% of revenue, above the 20% mark.",
            overhead_pct
        ));
    }

    // 5: DB I spread across the configured dimension
    if let Some((best, worst)) = db1_spread(transactions, config.dimension) {
        let spread = best.1 - worst.1;
        if spread > 10.0 {
            insights.push(format!(
                "DB I margin spreads {:.1} points across {} values ({} at {:.1}% vs {} at {:.1}%).",
                spread, config.dimension, best.0, best.1, worst.0, worst.1
            ));
        }
    }

    // 6: margin erosion between DB I and DB V
    let erosion = db1_pct - db5_pct;
    if erosion > 40.0 {
        insights.push(format!(
            "Margin erodes {:.1} points between DB I and DB V; the fixed cost block absorbs the contribution.",
            erosion
        ));
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

/// Best and worst DB I percentage across dimension values with revenue.
fn db1_spread(transactions: &[Transaction], dimension: Dimension) -> Option<((String, f64), (String, f64))> {
    let rollup = rollup(transactions, dimension);
    let mut with_revenue = rollup
        .slices
        .into_iter()
        .filter(|s| s.revenue > 0.0)
        .map(|s| {
            let pct = s.levels.first().map(|l| l.pct_of_revenue).unwrap_or(0.0);
            (s.key, pct)
        });
    let first = with_revenue.next()?;
    let mut best = first.clone();
    let mut worst = first;
    for slice in with_revenue {
        if slice.1 > best.1 {
            best = slice.clone();
        }
        if slice.1 < worst.1 {
            worst = slice;
        }
    }
    if best.0 == worst.0 {
        return None;
    }
    Some((best, worst))
}

/// Revenue and the full cascade per value of a dimension, ranked by revenue
/// descending. Postings without a value land in the unassigned bucket.
pub fn rollup(transactions: &[Transaction], dimension: Dimension) -> DimensionRollup {
    #[derive(Default)]
    struct SliceAcc {
        revenue_signed: f64,
        cost_groups: [f64; 5],
        count: usize,
    }

    let mut acc: BTreeMap<String, SliceAcc> = BTreeMap::new();
    for tx in transactions {
        let slot = acc.entry(aggregate::dimension_key(tx, dimension)).or_default();
        match classify_account(tx.account).group_index() {
            None => slot.revenue_signed += tx.amount,
            Some(idx) => slot.cost_groups[idx] += tx.amount.abs(),
        }
        slot.count += 1;
    }

    let mut slices: Vec<DimensionSlice> = acc
        .into_iter()
        .map(|(key, slot)| {
            let totals = CategoryTotals {
                revenue: slot.revenue_signed.abs(),
                cost_groups: slot.cost_groups,
            };
            DimensionSlice {
                key,
                revenue: round2(totals.revenue),
                levels: cascade(&totals),
                booking_count: slot.count,
            }
        })
        .collect();
    // stable sort keeps the alphabetical key order on revenue ties
    slices.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal));

    debug!(dimension = %dimension, slices = slices.len(), "dimension rollup complete");
    DimensionRollup { dimension, slices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(account: u32, amount: f64, cost_center: Option<&str>) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            amount,
            account,
            account_name: format!("Account {account}"),
            cost_center: cost_center.map(String::from),
            profit_center: None,
            document_no: "B-1".into(),
            description: "posting".into(),
            counterparty: None,
        }
    }

    /// Revenue 1.0m, variable 400k, personnel 200k, other 100k, overhead
    /// 150k, taxes 50k.
    fn reference_period() -> Vec<Transaction> {
        vec![
            tx(4400, -1_000_000.0, Some("VERTRIEB")),
            tx(5400, 400_000.0, Some("PROD")),
            tx(6020, 200_000.0, Some("PROD")),
            tx(6300, 100_000.0, Some("PROD")),
            tx(6820, 150_000.0, Some("VERW")),
            tx(7700, 50_000.0, None),
        ]
    }

    #[test]
    fn cascade_matches_the_reference_period() {
        let result = analyze(&reference_period(), &AnalysisConfig::default());
        assert_eq!(result.revenue, 1_000_000.0);

        let expected = [
            ("DB I", 600_000.0, 60.0),
            ("DB II", 400_000.0, 40.0),
            ("DB III", 300_000.0, 30.0),
            ("DB IV", 150_000.0, 15.0),
            ("DB V", 100_000.0, 10.0),
        ];
        for (level, (label, amount, pct)) in result.levels.iter().zip(expected) {
            assert_eq!(level.label, label);
            assert_eq!(level.amount, amount);
            assert_eq!(level.pct_of_revenue, pct);
        }
    }

    #[test]
    fn cascade_closes_with_cent_amounts() {
        let txs = vec![
            tx(4400, -123_456.78, None),
            tx(5400, 23_399.99, None),
            tx(6020, 17_250.01, None),
            tx(6300, 9_999.49, None),
            tx(6820, 31_000.33, None),
            tx(7700, 4_100.10, None),
        ];
        let result = analyze(&txs, &AnalysisConfig::default());
        let mut previous = result.revenue;
        let costs = [23_399.99, 17_250.01, 9_999.49, 31_000.33, 4_100.10];
        for (level, cost) in result.levels.iter().zip(costs) {
            assert!(
                (previous - level.amount - cost).abs() < 0.011,
                "cascade step does not close: {} - {} vs {}",
                previous,
                level.amount,
                cost
            );
            previous = level.amount;
        }
    }

    #[test]
    fn waterfall_alternates_and_anchors_deltas() {
        let result = analyze(&reference_period(), &AnalysisConfig::default());
        assert_eq!(result.waterfall.len(), 11);

        for (idx, step) in result.waterfall.iter().enumerate() {
            let expected = if idx % 2 == 0 {
                WaterfallKind::Subtotal
            } else {
                WaterfallKind::Delta
            };
            assert_eq!(step.kind, expected, "step {idx} ({})", step.label);
            if step.kind == WaterfallKind::Subtotal {
                assert_eq!(step.base, 0.0);
            }
        }

        // first delta hangs from revenue and subtracts variable costs
        let variable = &result.waterfall[1];
        assert_eq!(variable.base, 1_000_000.0);
        assert_eq!(variable.value, -400_000.0);
        // running total carries forward
        let personnel = &result.waterfall[3];
        assert_eq!(personnel.base, 600_000.0);
        assert_eq!(personnel.value, -200_000.0);
        assert_eq!(result.waterfall[10].value, 100_000.0);
    }

    #[test]
    fn rows_interleave_categories_and_margins() {
        let result = analyze(&reference_period(), &AnalysisConfig::default());
        assert_eq!(result.rows.len(), 11);
        assert_eq!(result.rows[0].label, "Revenue");
        assert_eq!(result.rows[1].label, "Variable costs");
        assert_eq!(result.rows[2].label, "DB I");
        assert_eq!(result.rows[2].kind, RowKind::Margin);
        assert!(result.rows[2].children.is_empty());
        assert_eq!(result.rows[10].label, "DB V");
        assert_eq!(result.rows[10].amount, 100_000.0);
    }

    #[test]
    fn drill_down_ranks_and_truncates_accounts() {
        let mut txs = reference_period();
        txs.push(tx(6840, 90_000.0, Some("VERW")));
        txs.push(tx(6850, 120_000.0, Some("VERW")));

        let config = AnalysisConfig {
            top_accounts: 2,
            ..AnalysisConfig::default()
        };
        let result = analyze(&txs, &config);
        let overhead = result
            .rows
            .iter()
            .find(|r| r.label == "Overhead")
            .unwrap();
        assert_eq!(overhead.children.len(), 2);
        assert_eq!(overhead.children[0].account, 6820);
        assert_eq!(overhead.children[0].amount, 150_000.0);
        assert_eq!(overhead.children[1].account, 6850);
    }

    #[test]
    fn reference_period_insights_fire_in_rule_order() {
        let result = analyze(&reference_period(), &AnalysisConfig::default());
        assert_eq!(result.insights.len(), 3);
        assert!(result.insights[0].contains("DB I margin of 60.0% is strong"));
        assert!(result.insights[1].contains("Net margin of 10.0% is comfortable"));
        assert!(result.insights[2].contains("erodes 50.0 points"));
    }

    #[test]
    fn loss_period_reports_negative_net_margin() {
        let txs = vec![
            tx(4400, -100_000.0, None),
            tx(5400, 70_000.0, None),
            tx(6020, 40_000.0, None),
        ];
        let result = analyze(&txs, &AnalysisConfig::default());
        assert!(result.insights.iter().any(|i| i.contains("closes at a loss")));
        assert!(result
            .insights
            .iter()
            .any(|i| i.contains("Personnel costs take 40.0%")));
    }

    #[test]
    fn overhead_warning_fires_above_twenty_percent() {
        let txs = vec![tx(4400, -100_000.0, None), tx(6820, 25_000.0, None)];
        let result = analyze(&txs, &AnalysisConfig::default());
        assert!(result
            .insights
            .iter()
            .any(|i| i.contains("Overhead takes 25.0%")));
    }

    #[test]
    fn spread_insight_compares_dimension_values() {
        let txs = vec![
            tx(4400, -100_000.0, Some("A")),
            tx(5400, 20_000.0, Some("A")),
            tx(4410, -100_000.0, Some("B")),
            tx(5400, 60_000.0, Some("B")),
        ];
        let result = analyze(&txs, &AnalysisConfig::default());
        let spread = result
            .insights
            .iter()
            .find(|i| i.contains("spreads"))
            .expect("spread insight");
        assert!(spread.contains("A at 80.0%"));
        assert!(spread.contains("B at 40.0%"));
    }

    #[test]
    fn empty_input_yields_zero_result_with_one_insight() {
        let result = analyze(&[], &AnalysisConfig::default());
        assert_eq!(result.revenue, 0.0);
        assert_eq!(result.levels.len(), 5);
        assert!(result.levels.iter().all(|l| l.amount == 0.0 && l.pct_of_revenue == 0.0));
        assert_eq!(result.waterfall.len(), 11);
        assert_eq!(result.insights.len(), 1);
        assert!(result.insights[0].contains("No postings"));
    }

    #[test]
    fn rollup_ranks_by_revenue_with_unassigned_bucket() {
        let txs = vec![
            tx(4400, -40_000.0, Some("NORD")),
            tx(4400, -90_000.0, Some("SUED")),
            tx(5400, 10_000.0, Some("SUED")),
            tx(6820, 5_000.0, None),
        ];
        let rollup = rollup(&txs, Dimension::CostCenter);
        assert_eq!(rollup.slices.len(), 3);
        assert_eq!(rollup.slices[0].key, "SUED");
        assert_eq!(rollup.slices[0].revenue, 90_000.0);
        assert_eq!(rollup.slices[0].levels[0].amount, 80_000.0);
        assert_eq!(rollup.slices[1].key, "NORD");
        assert_eq!(rollup.slices[2].key, crate::aggregate::UNASSIGNED_KEY);
        assert_eq!(rollup.slices[2].revenue, 0.0);
    }

    #[test]
    fn rollup_order_is_stable_on_revenue_ties() {
        let txs = vec![
            tx(4400, -50_000.0, Some("B")),
            tx(4400, -50_000.0, Some("A")),
        ];
        let rollup = rollup(&txs, Dimension::CostCenter);
        assert_eq!(rollup.slices[0].key, "A");
        assert_eq!(rollup.slices[1].key, "B");
    }
}
