//! Root-cause clustering for a single account's variance

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Datelike;
use regex::Regex;
use tracing::debug;

use crate::aggregate::dimension_key;
use crate::classify::{delta, round1, round2, safe_pct};
use crate::config::AnalysisConfig;
use crate::models::{
    BookingCluster, ClusterKind, Dimension, RootCauseResult, Transaction, VarianceDriver,
};

const TOP_DRIVERS_PER_DIMENSION: usize = 5;
const DRIVER_DIMENSIONS: [Dimension; 3] = [
    Dimension::CostCenter,
    Dimension::ProfitCenter,
    Dimension::Counterparty,
];

/// Explains why one account's value changed between two periods.
///
/// Postings are paired across periods on a normalized description key, so
/// recurring items match even when invoice numbers or dates differ inside
/// the text. The result is complete without any narrative attached.
pub fn explain_account(
    account: u32,
    prior: &[Transaction],
    current: &[Transaction],
    config: &AnalysisConfig,
) -> RootCauseResult {
    let prior_txs: Vec<&Transaction> = prior.iter().filter(|t| t.account == account).collect();
    let current_txs: Vec<&Transaction> = current.iter().filter(|t| t.account == account).collect();

    let prior_total: f64 = prior_txs.iter().map(|t| t.amount).sum();
    let current_total: f64 = current_txs.iter().map(|t| t.amount).sum();
    let d = delta(prior_total, current_total);

    let strip = Regex::new(r"[0-9]+|[[:punct:]]+").expect("valid regex");
    let prior_groups = booking_groups(&prior_txs, &strip);
    let current_groups = booking_groups(&current_txs, &strip);

    // single large unmatched bookings count as one-time items, not new costs
    let one_time_cutoff = config.materiality_abs.max(0.25 * d.abs.abs());

    let mut buckets: BTreeMap<ClusterKind, (f64, Vec<Transaction>)> = BTreeMap::new();
    let mut matched_magnitude = 0.0;
    let total_magnitude: f64 = prior_groups.values().chain(current_groups.values())
        .map(|g| g.magnitude)
        .sum();

    for (key, cur) in &current_groups {
        match prior_groups.get(key) {
            Some(prev) => {
                matched_magnitude += prev.magnitude + cur.magnitude;
                if let Some(kind) = classify_matched(prev, cur) {
                    let mut txs = cur.transactions.clone();
                    txs.extend(prev.transactions.iter().cloned());
                    add_to_bucket(&mut buckets, kind, cur.total - prev.total, &txs);
                }
            }
            None => {
                let kind = if cur.count == 1 && cur.total.abs() >= one_time_cutoff {
                    ClusterKind::OneTime
                } else {
                    ClusterKind::NewCost
                };
                add_to_bucket(&mut buckets, kind, cur.total, &cur.transactions);
            }
        }
    }
    for (key, prev) in &prior_groups {
        if !current_groups.contains_key(key) {
            add_to_bucket(
                &mut buckets,
                ClusterKind::RemovedCost,
                -prev.total,
                &prev.transactions,
            );
        }
    }

    let explained: f64 = buckets.values().map(|(amount, _)| amount).sum();
    let mut clusters: Vec<BookingCluster> = buckets
        .into_iter()
        .map(|(kind, (amount, transactions))| BookingCluster {
            kind,
            amount: round2(amount),
            contribution_pct: round1(safe_pct(amount, d.abs)),
            transactions,
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.amount
            .abs()
            .partial_cmp(&a.amount.abs())
            .unwrap_or(Ordering::Equal)
    });

    let drivers = dimension_drivers(&prior_txs, &current_txs, d.abs);
    let confidence = confidence_score(d.abs, explained, matched_magnitude, total_magnitude);

    let account_name = first_name(&current_txs)
        .or_else(|| first_name(&prior_txs))
        .map(String::from)
        .unwrap_or_else(|| format!("Account {account}"));

    debug!(
        account,
        clusters = clusters.len(),
        confidence,
        "root-cause clustering complete"
    );
    RootCauseResult {
        account,
        account_name,
        prior_total: round2(prior_total),
        current_total: round2(current_total),
        delta_abs: round2(d.abs),
        delta_pct: round1(d.pct),
        clusters,
        drivers,
        confidence,
        narrative: None,
    }
}

fn add_to_bucket(
    buckets: &mut BTreeMap<ClusterKind, (f64, Vec<Transaction>)>,
    kind: ClusterKind,
    amount: f64,
    transactions: &[Transaction],
) {
    let bucket = buckets.entry(kind).or_default();
    bucket.0 += amount;
    bucket.1.extend_from_slice(transactions);
}

struct BookingGroup {
    total: f64,
    magnitude: f64,
    count: usize,
    counterparty: Option<String>,
    /// Booking magnitude per calendar month
    months: BTreeMap<u32, f64>,
    transactions: Vec<Transaction>,
}

impl BookingGroup {
    fn dominant_month(&self) -> Option<u32> {
        self.months
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
            .map(|(month, _)| *month)
    }
}

fn booking_groups(transactions: &[&Transaction], strip: &Regex) -> BTreeMap<String, BookingGroup> {
    let mut groups: BTreeMap<String, BookingGroup> = BTreeMap::new();
    for tx in transactions {
        let mut key = normalize_description(&tx.description, strip);
        if key.is_empty() {
            key = tx
                .counterparty
                .as_deref()
                .map(|c| c.to_lowercase())
                .unwrap_or_default();
        }
        let group = groups.entry(key).or_insert_with(|| BookingGroup {
            total: 0.0,
            magnitude: 0.0,
            count: 0,
            counterparty: None,
            months: BTreeMap::new(),
            transactions: Vec::new(),
        });
        group.total += tx.amount;
        group.magnitude += tx.amount.abs();
        group.count += 1;
        if group.counterparty.is_none() {
            group.counterparty = tx.counterparty.as_deref().map(|c| c.to_lowercase());
        }
        *group.months.entry(tx.date.month()).or_default() += tx.amount.abs();
        group.transactions.push((*tx).clone());
    }
    groups
}

/// Lowercase, drop digit runs and punctuation, collapse whitespace. Keeps
/// "Miete Büro 2024-03" and "Miete Büro 2025-03" on the same key.
fn normalize_description(description: &str, strip: &Regex) -> String {
    let lowered = description.to_lowercase();
    let stripped = strip.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn classify_matched(prev: &BookingGroup, cur: &BookingGroup) -> Option<ClusterKind> {
    let contribution = cur.total - prev.total;
    if let (Some(a), Some(b)) = (&prev.counterparty, &cur.counterparty) {
        if a != b {
            return Some(ClusterKind::VendorChange);
        }
    }
    let amount_stable = prev.total != 0.0 && contribution.abs() <= 0.01 * prev.total.abs();
    if amount_stable && prev.dominant_month() != cur.dominant_month() {
        return Some(ClusterKind::TimingShift);
    }
    if contribution.abs() < 0.005 {
        return None;
    }
    if cur.count == prev.count {
        return Some(ClusterKind::PriceChange);
    }
    let avg_prev = prev.total / prev.count as f64;
    let avg_cur = cur.total / cur.count as f64;
    if avg_prev == 0.0 {
        return Some(ClusterKind::PriceChange);
    }
    if (avg_cur - avg_prev).abs() <= 0.1 * avg_prev.abs() {
        return Some(ClusterKind::VolumeChange);
    }
    // both unit value and booking count moved; attribute to the larger move
    let count_move = (cur.count as f64 / prev.count as f64 - 1.0).abs();
    let price_move = (avg_cur / avg_prev - 1.0).abs();
    if price_move > count_move {
        Some(ClusterKind::PriceChange)
    } else {
        Some(ClusterKind::VolumeChange)
    }
}

/// Prior/current movement per dimension value, restricted to the account's
/// postings, top movers first.
fn dimension_drivers(
    prior: &[&Transaction],
    current: &[&Transaction],
    total_delta: f64,
) -> Vec<VarianceDriver> {
    let mut out = Vec::new();
    for dimension in DRIVER_DIMENSIONS {
        let mut keys: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for tx in prior {
            keys.entry(dimension_key(tx, dimension)).or_default().0 += tx.amount;
        }
        for tx in current {
            keys.entry(dimension_key(tx, dimension)).or_default().1 += tx.amount;
        }
        let mut movers: Vec<(String, f64, f64)> = keys
            .into_iter()
            .filter(|(_, (p, c))| (c - p).abs() > 0.0)
            .map(|(key, (p, c))| (key, p, c))
            .collect();
        movers.sort_by(|a, b| {
            (b.2 - b.1)
                .abs()
                .partial_cmp(&(a.2 - a.1).abs())
                .unwrap_or(Ordering::Equal)
        });
        movers.truncate(TOP_DRIVERS_PER_DIMENSION);
        out.extend(movers.into_iter().map(|(key, p, c)| VarianceDriver {
            dimension,
            key,
            prior_amount: round2(p),
            current_amount: round2(c),
            contribution_pct: round1(safe_pct(c - p, total_delta)),
        }));
    }
    out
}

/// Blend of how much of the variance the clusters cover and how much of the
/// booking volume could be paired at all. 0.0 when there is no data.
fn confidence_score(
    total_delta: f64,
    explained: f64,
    matched_magnitude: f64,
    total_magnitude: f64,
) -> f64 {
    if total_magnitude == 0.0 {
        return 0.0;
    }
    let residual = total_delta - explained;
    let coverage = 1.0 - (residual.abs() / total_delta.abs().max(1.0)).min(1.0);
    let matched_share = matched_magnitude / total_magnitude;
    round2((0.6 * coverage + 0.4 * matched_share).clamp(0.0, 1.0))
}

fn first_name<'a>(transactions: &[&'a Transaction]) -> Option<&'a str> {
    transactions
        .iter()
        .find(|t| !t.account_name.is_empty())
        .map(|t| t.account_name.as_str())
}
