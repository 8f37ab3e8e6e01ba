//! Skew Core Library
//!
//! Deviation and root-cause analytics for controlling data:
//! - Account classification into the contribution margin scheme
//! - Dimension aggregation over cost centers, profit centers and accounts
//! - Materiality filtering and traffic-light status classification
//! - Contribution margin cascade (DB I through DB V) with waterfall and insights
//! - Triple variance (prior year / plan / actual) at account and cost center grain
//! - Root-cause clustering of booking-level changes
//! - Pluggable local narrative backends (Ollama, mock)
//!
//! Every engine is a pure synchronous function over in-memory slices; the
//! only async boundary is the optional narrative generation in [`ai`].

pub mod aggregate;
pub mod ai;
pub mod classify;
pub mod cluster;
pub mod config;
pub mod error;
pub mod import;
pub mod margin;
pub mod models;
pub mod variance;


pub use ai::{narrate_root_cause, MockBackend, NarrativeBackend, NarrativeClient, OllamaBackend};
pub use classify::{classify_account, classify_status, is_expense_account, is_material, Delta};
pub use cluster::explain_account;
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use import::{parse_plan_table, parse_transactions_csv};
pub use margin::{analyze, rollup};
pub use models::{
    AccountContribution, AccountDeviation, AccountLine, BookingCluster, ClusterKind,
    ContributionResult, CostCategory, CostCenterDeviation, DeviationStatus, Dimension,
    DimensionRollup, DimensionSlice, MarginLevel, PlanEntry, PlanTable, ReportRow,
    RootCauseResult, RowKind, TrafficLight, Transaction, TripleAccountDeviation, VarianceDriver,
    VarianceReport, VarianceSummary, WaterfallKind, WaterfallStep,
};
pub use variance::{compare_periods, reconcile};
