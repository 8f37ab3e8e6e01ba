//! Loading transaction exports and plan tables

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{PlanEntry, PlanTable, Transaction};

/// Canonical transaction export layout:
/// `date,amount,account,account_name,cost_center,profit_center,document,description,counterparty`
/// with a header row. Date and the two numeric columns are strict, the
/// optional text columns may be empty.
pub fn parse_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let row = idx + 2; // line 1 is the header
        let date_raw = field(&record, 0);
        let date = parse_date(date_raw).ok_or_else(|| {
            Error::InvalidData(format!("row {row}: unparseable date '{date_raw}'"))
        })?;
        let amount_raw = field(&record, 1);
        let amount = parse_amount(amount_raw).ok_or_else(|| {
            Error::InvalidData(format!("row {row}: unparseable amount '{amount_raw}'"))
        })?;
        let account_raw = field(&record, 2);
        let account: u32 = account_raw.parse().map_err(|_| {
            Error::InvalidData(format!("row {row}: invalid account '{account_raw}'"))
        })?;

        out.push(Transaction {
            date,
            amount,
            account,
            account_name: field(&record, 3).to_string(),
            cost_center: optional(field(&record, 4)),
            profit_center: optional(field(&record, 5)),
            document_no: field(&record, 6).to_string(),
            description: field(&record, 7).to_string(),
            counterparty: optional(field(&record, 8)),
        });
    }
    debug!(count = out.len(), "parsed transaction export");
    Ok(out)
}

/// Parses a delimited plan table.
///
/// The delimiter is sniffed (semicolon, tab or comma), columns are found by
/// substring match on a German or English header row, and a headerless
/// two-column "account, amount" layout works as a fallback. Rows without a
/// numeric account and amount are skipped; malformed input yields an empty
/// table, never an error.
pub fn parse_plan_table(input: &str) -> PlanTable {
    let delimiter = sniff_delimiter(input);
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());
    let records: Vec<StringRecord> = rdr.records().filter_map(|r| r.ok()).collect();

    let columns = records.first().and_then(detect_plan_columns);
    let (columns, data) = match columns {
        Some(columns) => (columns, &records[1..]),
        None => (
            PlanColumns {
                account: 0,
                name: None,
                amount: 1,
            },
            &records[..],
        ),
    };

    let mut plan = PlanTable::new();
    for (idx, record) in data.iter().enumerate() {
        let account = record.get(columns.account).and_then(|v| v.parse::<u32>().ok());
        let amount = record.get(columns.amount).and_then(parse_amount);
        match (account, amount) {
            (Some(account), Some(amount)) => {
                let name = columns
                    .name
                    .and_then(|col| record.get(col))
                    .map(str::to_string)
                    .filter(|n| !n.is_empty());
                plan.insert(PlanEntry {
                    account,
                    name,
                    amount,
                });
            }
            _ => debug!(row = idx + 1, "skipping non-numeric plan row"),
        }
    }
    debug!(entries = plan.len(), "parsed plan table");
    plan
}

struct PlanColumns {
    account: usize,
    name: Option<usize>,
    amount: usize,
}

fn detect_plan_columns(header: &StringRecord) -> Option<PlanColumns> {
    let cells: Vec<String> = header.iter().map(|c| c.to_lowercase()).collect();
    let find = |needles: &[&str]| {
        cells
            .iter()
            .position(|cell| needles.iter().any(|n| cell.contains(n)))
    };
    let account = find(&["konto", "account"])?;
    let amount = find(&["plan", "betrag", "amount", "budget"])?;
    if account == amount {
        return None;
    }
    let name = find(&["bezeichnung", "name", "beschreibung", "description"]);
    Some(PlanColumns {
        account,
        name,
        amount,
    })
}

fn sniff_delimiter(input: &str) -> u8 {
    let first = input.lines().next().unwrap_or("");
    let semis = first.matches(';').count();
    let tabs = first.matches('\t').count();
    let commas = first.matches(',').count();
    if semis > 0 && semis >= tabs && semis >= commas {
        b';'
    } else if tabs > 0 && tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("")
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d.%m.%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), format) {
            return Some(date);
        }
    }
    None
}

/// Accepts German ("1.234,56"), English ("1,234.56"), plain ("-300.5") and
/// parenthesized negative amounts, with currency symbols dropped.
pub(crate) fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let negated = trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            // German: dots group thousands, comma is the decimal mark
            cleaned.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() > 1 || decimals == 3 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .ok()
        .map(|v| if negated { -v } else { v })
}
