//! Grouping primitives shared by the analysis engines

use std::collections::BTreeMap;

use crate::classify::classify_account;
use crate::models::{Dimension, Transaction};

/// Bucket key for postings without a value in the grouping dimension.
pub const UNASSIGNED_KEY: &str = "unassigned";

/// Signed sum, unsigned booking impact and posting count for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupTotals {
    pub signed: f64,
    /// Sum of per-posting absolute amounts
    pub magnitude: f64,
    pub count: usize,
}

impl GroupTotals {
    pub fn add(&mut self, amount: f64) {
        self.signed += amount;
        self.magnitude += amount.abs();
        self.count += 1;
    }
}

/// A posting's key under a dimension. Missing optional fields land in the
/// explicit unassigned bucket instead of disappearing from the report.
pub fn dimension_key(tx: &Transaction, dimension: Dimension) -> String {
    let value = match dimension {
        Dimension::Account => return tx.account.to_string(),
        Dimension::CostCenter => tx.cost_center.as_deref(),
        Dimension::ProfitCenter => tx.profit_center.as_deref(),
        Dimension::Counterparty => tx.counterparty.as_deref(),
    };
    value.unwrap_or(UNASSIGNED_KEY).to_string()
}

/// Group postings by a dimension. BTreeMap keeps the group order stable
/// across runs.
pub fn group_by_dimension(
    transactions: &[Transaction],
    dimension: Dimension,
) -> BTreeMap<String, GroupTotals> {
    let mut groups: BTreeMap<String, GroupTotals> = BTreeMap::new();
    for tx in transactions {
        groups
            .entry(dimension_key(tx, dimension))
            .or_default()
            .add(tx.amount);
    }
    groups
}

/// Group postings by ledger account.
pub fn group_by_account(transactions: &[Transaction]) -> BTreeMap<u32, GroupTotals> {
    let mut groups: BTreeMap<u32, GroupTotals> = BTreeMap::new();
    for tx in transactions {
        groups.entry(tx.account).or_default().add(tx.amount);
    }
    groups
}

/// Net revenue and positive cost-group impacts for one posting slice.
///
/// Cost groups accumulate per-posting absolute amounts, so a cost credit
/// still counts as booking impact. Revenue is the signed net normalized
/// positive, which lets credit-convention feeds and refunds cancel out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryTotals {
    pub revenue: f64,
    /// Indexed like `CostCategory::COST_GROUPS`
    pub cost_groups: [f64; 5],
}

pub fn category_totals(transactions: &[Transaction]) -> CategoryTotals {
    let mut revenue_signed = 0.0;
    let mut cost_groups = [0.0; 5];
    for tx in transactions {
        match classify_account(tx.account).group_index() {
            None => revenue_signed += tx.amount,
            Some(idx) => cost_groups[idx] += tx.amount.abs(),
        }
    }
    CategoryTotals {
        revenue: revenue_signed.abs(),
        cost_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(account: u32, amount: f64, cost_center: Option<&str>) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            amount,
            account,
            account_name: format!("Account {account}"),
            cost_center: cost_center.map(String::from),
            profit_center: None,
            document_no: "B-100".into(),
            description: "test posting".into(),
            counterparty: None,
        }
    }

    #[test]
    fn groups_carry_signed_and_impact_sums() {
        let txs = vec![
            tx(6820, 1_000.0, Some("VERW")),
            tx(6820, -250.0, Some("VERW")),
        ];
        let groups = group_by_dimension(&txs, Dimension::CostCenter);
        let verw = &groups["VERW"];
        assert_eq!(verw.signed, 750.0);
        assert_eq!(verw.magnitude, 1_250.0);
        assert_eq!(verw.count, 2);
    }

    #[test]
    fn missing_dimension_values_land_in_unassigned() {
        let txs = vec![tx(6820, 100.0, Some("VERW")), tx(6820, 200.0, None)];
        let groups = group_by_dimension(&txs, Dimension::CostCenter);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[UNASSIGNED_KEY].signed, 200.0);
    }

    #[test]
    fn account_grouping_is_keyed_by_ledger_number() {
        let txs = vec![
            tx(4400, -500.0, None),
            tx(4400, -700.0, None),
            tx(6820, 300.0, None),
        ];
        let groups = group_by_account(&txs);
        assert_eq!(groups[&4400].signed, -1_200.0);
        assert_eq!(groups[&6820].count, 1);
    }

    #[test]
    fn revenue_nets_while_cost_groups_take_impact() {
        let txs = vec![
            // credit-convention revenue with a refund
            tx(4400, -100_000.0, None),
            tx(4400, 5_000.0, None),
            // overhead with a vendor credit
            tx(6820, 20_000.0, None),
            tx(6820, -2_000.0, None),
        ];
        let totals = category_totals(&txs);
        assert_eq!(totals.revenue, 95_000.0);
        // overhead is the fourth cost group
        assert_eq!(totals.cost_groups[3], 22_000.0);
        assert_eq!(totals.cost_groups[0], 0.0);
    }
}
