//! Analysis configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Dimension;

/// Thresholds and limits shared by all analysis engines.
///
/// Zero or negative thresholds are valid configuration: they widen the
/// materiality gate until everything is reported. Nothing here is ever
/// rejected, callers get exactly the bands they ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum absolute deviation for a position to be reported
    pub materiality_abs: f64,
    /// Minimum percentage deviation (both legs must pass)
    pub materiality_pct: f64,
    /// Status band: deviations up to this percentage are on track
    pub yellow_pct: f64,
    /// Status band: deviations beyond this percentage are critical
    pub red_pct: f64,
    /// Accounts at or above this id are treated as expense accounts
    pub expense_account_min: u32,
    /// Postings listed per reported deviation
    pub top_transactions: usize,
    /// Drill-down accounts listed per report row
    pub top_accounts: usize,
    /// Default grouping dimension for roll-ups and spread insights
    pub dimension: Dimension,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            materiality_abs: 5_000.0,
            materiality_pct: 5.0,
            yellow_pct: 5.0,
            red_pct: 10.0,
            expense_account_min: 5_000,
            top_transactions: 5,
            top_accounts: 15,
            dimension: Dimension::CostCenter,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_materiality(mut self, abs: f64, pct: f64) -> Self {
        self.materiality_abs = abs;
        self.materiality_pct = pct;
        self
    }

    pub fn with_status_bands(mut self, yellow_pct: f64, red_pct: f64) -> Self {
        self.yellow_pct = yellow_pct;
        self.red_pct = red_pct;
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = dimension;
        self
    }
}
