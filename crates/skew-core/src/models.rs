//! Domain models for Skew

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single posting from the bookkeeping export.
///
/// Amounts are signed and follow the convention of the feed (costs and
/// revenue may arrive with either sign); the engines normalize where the
/// math requires it. The core only ever borrows slices of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: f64,
    /// Ledger account number, e.g. 4400 or 6820
    pub account: u32,
    pub account_name: String,
    pub cost_center: Option<String>,
    pub profit_center: Option<String>,
    pub document_no: String,
    pub description: String,
    /// Vendor or customer, when the feed carries one
    pub counterparty: Option<String>,
}

/// One row of an imported plan table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub account: u32,
    pub name: Option<String>,
    pub amount: f64,
}

/// Planned amounts per ledger account.
///
/// Accounts without an entry fall back to their prior-year sum during
/// reconciliation ("no plan" reads as "flat versus last year").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanTable {
    entries: BTreeMap<u32, PlanEntry>,
}

impl PlanTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: PlanEntry) {
        self.entries.insert(entry.account, entry);
    }

    pub fn get(&self, account: u32) -> Option<&PlanEntry> {
        self.entries.get(&account)
    }

    pub fn amount(&self, account: u32) -> Option<f64> {
        self.entries.get(&account).map(|e| e.amount)
    }

    pub fn accounts(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The six cost types of the contribution margin scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Revenue,
    /// Variable costs (material, merchandise)
    Variable,
    /// Directly attributable personnel costs
    DirectPersonnel,
    /// Other directly attributable costs
    DirectOther,
    Overhead,
    /// Taxes, depreciation and interest
    TaxDepreciation,
}

impl CostCategory {
    /// The five cost groups subtracted in the DB I..DB V cascade, in
    /// subtraction order.
    pub const COST_GROUPS: [Self; 5] = [
        Self::Variable,
        Self::DirectPersonnel,
        Self::DirectOther,
        Self::Overhead,
        Self::TaxDepreciation,
    ];

    /// Position in `COST_GROUPS`; `None` for revenue.
    pub fn group_index(&self) -> Option<usize> {
        Self::COST_GROUPS.iter().position(|c| c == self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Variable => "variable",
            Self::DirectPersonnel => "direct_personnel",
            Self::DirectOther => "direct_other",
            Self::Overhead => "overhead",
            Self::TaxDepreciation => "tax_depreciation",
        }
    }

    /// Display label for report rows
    pub fn label(&self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::Variable => "Variable costs",
            Self::DirectPersonnel => "Direct personnel",
            Self::DirectOther => "Other direct costs",
            Self::Overhead => "Overhead",
            Self::TaxDepreciation => "Taxes & depreciation",
        }
    }
}

impl std::fmt::Display for CostCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grouping key for aggregation and drill-down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Account,
    CostCenter,
    ProfitCenter,
    Counterparty,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::CostCenter => "cost_center",
            Self::ProfitCenter => "profit_center",
            Self::Counterparty => "counterparty",
        }
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "account" | "konto" => Ok(Self::Account),
            "cost_center" | "costcenter" | "kostenstelle" => Ok(Self::CostCenter),
            "profit_center" | "profitcenter" => Ok(Self::ProfitCenter),
            "counterparty" | "vendor" | "partner" => Ok(Self::Counterparty),
            _ => Err(format!("Unknown dimension: {}", s)),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Four-state deviation status relative to plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationStatus {
    /// Within the yellow band on either side
    OnTrack,
    /// Unfavorably over plan (cost overrun or revenue shortfall)
    OverPlan,
    /// Favorably under plan
    UnderPlan,
    /// Beyond the red threshold in either direction
    Critical,
}

impl DeviationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on_track",
            Self::OverPlan => "over_plan",
            Self::UnderPlan => "under_plan",
            Self::Critical => "critical",
        }
    }

    pub fn traffic_light(&self) -> TrafficLight {
        match self {
            Self::OnTrack => TrafficLight::Green,
            Self::OverPlan | Self::UnderPlan => TrafficLight::Yellow,
            Self::Critical => TrafficLight::Red,
        }
    }
}

impl std::fmt::Display for DeviationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Traffic-light rollup of deviation statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
}

impl TrafficLight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl std::fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Explanatory cluster kinds for account-level variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    NewCost,
    RemovedCost,
    PriceChange,
    VolumeChange,
    VendorChange,
    TimingShift,
    OneTime,
}

impl ClusterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewCost => "new_cost",
            Self::RemovedCost => "removed_cost",
            Self::PriceChange => "price_change",
            Self::VolumeChange => "volume_change",
            Self::VendorChange => "vendor_change",
            Self::TimingShift => "timing_shift",
            Self::OneTime => "one_time",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NewCost => "New cost",
            Self::RemovedCost => "Removed cost",
            Self::PriceChange => "Price change",
            Self::VolumeChange => "Volume change",
            Self::VendorChange => "Vendor change",
            Self::TimingShift => "Timing shift",
            Self::OneTime => "One-time item",
        }
    }
}

impl std::fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Two-period deviation results
// ---------------------------------------------------------------------------

/// One account's deviation between two periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDeviation {
    pub account: u32,
    pub account_name: String,
    pub prior_amount: f64,
    pub current_amount: f64,
    pub delta_abs: f64,
    /// Percentage of the prior amount; 0.0 when prior is 0
    pub delta_pct: f64,
    pub prior_count: usize,
    pub current_count: usize,
    /// Largest current-period postings by absolute amount
    pub top_transactions: Vec<Transaction>,
    pub comment: String,
    /// `new_position`, `discontinued` or `spike` where one applies
    pub anomaly: Option<String>,
}

// ---------------------------------------------------------------------------
// Triple (prior year / plan / actual) reconciliation results
// ---------------------------------------------------------------------------

/// One account reconciled across prior year (Vorjahr), plan and actual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleAccountDeviation {
    pub account: u32,
    pub account_name: String,
    pub prior_year_amount: f64,
    pub plan_amount: f64,
    pub actual_amount: f64,
    pub plan_delta_abs: f64,
    pub plan_delta_pct: f64,
    pub prior_delta_abs: f64,
    pub prior_delta_pct: f64,
    pub plan_vs_prior_abs: f64,
    pub plan_vs_prior_pct: f64,
    /// Classified from the plan comparison
    pub status: DeviationStatus,
    /// Two sentences: plan comparison first, prior-year comparison second
    pub comment: String,
    pub top_transactions: Vec<Transaction>,
}

/// The same reconciliation at cost-center grain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCenterDeviation {
    pub cost_center: String,
    pub prior_year_amount: f64,
    pub plan_amount: f64,
    pub actual_amount: f64,
    pub plan_delta_abs: f64,
    pub plan_delta_pct: f64,
    pub prior_delta_abs: f64,
    pub prior_delta_pct: f64,
    pub status: DeviationStatus,
    /// Accounts contributing most to the plan deviation, largest first
    pub top_accounts: Vec<AccountContribution>,
}

/// An account's share of a cost center's plan deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountContribution {
    pub account: u32,
    pub account_name: String,
    pub plan_amount: f64,
    pub actual_amount: f64,
    pub delta_abs: f64,
}

/// Report-level figures across all accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub prior_year_total: f64,
    pub plan_total: f64,
    pub actual_total: f64,
    pub plan_delta_total: f64,
    /// Actual / plan in percent; 100.0 when the plan total is 0
    pub plan_achievement_pct: f64,
}

/// Full three-way variance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceReport {
    pub accounts: Vec<TripleAccountDeviation>,
    pub cost_centers: Vec<CostCenterDeviation>,
    pub summary: VarianceSummary,
}

// ---------------------------------------------------------------------------
// Contribution margin results
// ---------------------------------------------------------------------------

/// One margin level of the cascade (DB I through DB V).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginLevel {
    pub label: String,
    pub amount: f64,
    /// Percent of revenue; 0.0 when revenue is 0
    pub pct_of_revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Category,
    Margin,
}

/// One row of the margin report table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub kind: RowKind,
    pub amount: f64,
    pub pct_of_revenue: f64,
    /// Top contributing accounts; empty on margin rows
    pub children: Vec<AccountLine>,
}

/// Account drill-down line under a category row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLine {
    pub account: u32,
    pub account_name: String,
    pub amount: f64,
    pub pct_of_revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterfallKind {
    /// Bar anchored at zero showing a running subtotal
    Subtotal,
    /// Floating bar showing one cost group's subtraction
    Delta,
}

/// One bar of the margin waterfall, ready for chart rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallStep {
    pub label: String,
    pub kind: WaterfallKind,
    /// Lower anchor of the bar (running total before a delta; 0 on subtotals)
    pub base: f64,
    /// Bar extent; negative on cost deltas
    pub value: f64,
}

/// Result of the contribution margin analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionResult {
    pub revenue: f64,
    /// The five margin levels DB I..DB V, in cascade order
    pub levels: Vec<MarginLevel>,
    pub rows: Vec<ReportRow>,
    pub waterfall: Vec<WaterfallStep>,
    /// Rule-based findings, at most six, in fixed rule order
    pub insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Root-cause results
// ---------------------------------------------------------------------------

/// A named group of postings explaining part of an account's variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCluster {
    pub kind: ClusterKind,
    /// Signed contribution to the account's variance
    pub amount: f64,
    /// Share of the total variance; clusters need not sum to 100
    pub contribution_pct: f64,
    pub transactions: Vec<Transaction>,
}

/// Prior/current movement of one dimension value within an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceDriver {
    pub dimension: Dimension,
    pub key: String,
    pub prior_amount: f64,
    pub current_amount: f64,
    pub contribution_pct: f64,
}

/// Structured explanation of why one account's value changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootCauseResult {
    pub account: u32,
    pub account_name: String,
    pub prior_total: f64,
    pub current_total: f64,
    pub delta_abs: f64,
    pub delta_pct: f64,
    pub clusters: Vec<BookingCluster>,
    pub drivers: Vec<VarianceDriver>,
    /// How well the clusters explain the variance, in [0, 1]
    pub confidence: f64,
    /// Attached by the optional narrative enrichment, never required
    pub narrative: Option<String>,
}

// ---------------------------------------------------------------------------
// Dimension roll-up results
// ---------------------------------------------------------------------------

/// Revenue and margin cascade for one dimension value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSlice {
    pub key: String,
    pub revenue: f64,
    pub levels: Vec<MarginLevel>,
    pub booking_count: usize,
}

/// Per-value margin roll-up over a chosen dimension, ranked by revenue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionRollup {
    pub dimension: Dimension,
    pub slices: Vec<DimensionSlice>,
}
