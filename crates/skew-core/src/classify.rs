//! Account classification, materiality gate and deviation status

use std::ops::RangeInclusive;

use crate::config::AnalysisConfig;
use crate::models::{CostCategory, DeviationStatus};

/// Default chart of accounts, checked in order. Anything outside the listed
/// ranges lands in overhead so the margin cascade always closes; an unknown
/// account is never an error.
const ACCOUNT_RULES: &[(RangeInclusive<u32>, CostCategory)] = &[
    (4000..=4999, CostCategory::Revenue),
    (5000..=5999, CostCategory::Variable),
    (6000..=6299, CostCategory::DirectPersonnel),
    (6300..=6599, CostCategory::DirectOther),
    (6600..=7499, CostCategory::Overhead),
    (7500..=7999, CostCategory::TaxDepreciation),
];

/// Maps a ledger account to its cost type. Total over all of `u32`.
pub fn classify_account(account: u32) -> CostCategory {
    for (range, category) in ACCOUNT_RULES {
        if range.contains(&account) {
            return *category;
        }
    }
    CostCategory::Overhead
}

/// Expense accounts flip the favorability of a deviation: more cost is bad,
/// more revenue is good.
pub fn is_expense_account(account: u32, config: &AnalysisConfig) -> bool {
    account >= config.expense_account_min
}

/// Absolute and relative deviation between two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub abs: f64,
    pub pct: f64,
}

/// `value` as a percentage of `base`, 0.0 when the base is 0.
pub fn safe_pct(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        value / base.abs() * 100.0
    }
}

pub fn delta(prior: f64, current: f64) -> Delta {
    let abs = current - prior;
    Delta {
        abs,
        pct: safe_pct(abs, prior),
    }
}

/// Both legs must pass: small-base noise needs the absolute leg, large-base
/// noise needs the percentage leg.
pub fn is_material(d: &Delta, config: &AnalysisConfig) -> bool {
    d.abs.abs() >= config.materiality_abs && d.pct.abs() >= config.materiality_pct
}

/// Four-state status from a percentage deviation.
///
/// Within the warning band the label follows favorability: a cost overrun
/// and a revenue shortfall are both `OverPlan`. Beyond the red threshold the
/// direction no longer matters, a large miss on either side is a planning
/// failure.
pub fn classify_status(
    delta_pct: f64,
    is_expense: bool,
    config: &AnalysisConfig,
) -> DeviationStatus {
    let magnitude = delta_pct.abs();
    if magnitude <= config.yellow_pct {
        return DeviationStatus::OnTrack;
    }
    if magnitude > config.red_pct {
        return DeviationStatus::Critical;
    }
    let unfavorable = if is_expense {
        delta_pct > 0.0
    } else {
        delta_pct < 0.0
    };
    if unfavorable {
        DeviationStatus::OverPlan
    } else {
        DeviationStatus::UnderPlan
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
