//! Row coercion from raw cells to typed transactions
//!
//! A row survives only if both its date and its amount coerce. Failed rows
//! are dropped, never defaulted, and counted per cause in the table's
//! [`DropReport`].

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::debug;

use crate::categorize::KeywordMap;
use crate::models::{
    Cell, ColumnRef, ColumnRoleMap, DropReport, NormalizedTable, RawTable, SignPolicy, Transaction,
};

/// Category for rows whose category cell is blank
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Largest serial a spreadsheet date can have (9999-12-31)
const MAX_SERIAL_DATE: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d/%m/%Y", // only reached when the first field can't be a month
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%B %d, %Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Amounts at or above this magnitude are rejected, which keeps every sum
/// over a table far inside `Decimal`'s range
pub const MAX_ABS_AMOUNT: i64 = 1_000_000_000_000_000;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];

/// Convert a spreadsheet serial date (1900 date system) to a calendar date
fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL_DATE).contains(&serial) {
        return None;
    }
    // Day zero is 1899-12-30 once the phantom 1900-02-29 is accounted for
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    None
}

/// Coerce a cell into a calendar date
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Text(s) => parse_date_text(s),
        Cell::Number(n) if n.fract() == 0.0 && *n > MAX_SERIAL_DATE => {
            // Compact yyyymmdd stored as a number
            parse_date_text(&format!("{}", *n as i64))
        }
        Cell::Number(n) => from_serial(*n),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

fn parse_amount_text(s: &str) -> Option<Decimal> {
    let mut text = s.trim().to_string();

    // Credit/debit markers carry no sign information of their own
    let upper = text.to_ascii_uppercase();
    if upper.ends_with("CR") || upper.ends_with("DR") {
        text.truncate(text.len() - 2);
    }

    let mut cleaned: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() > 2 {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
        negative = true;
    }
    if cleaned.len() > 1 && cleaned.ends_with('-') && !cleaned.starts_with('-') {
        cleaned.pop();
        negative = true;
    }
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}

/// Coerce a cell into a signed decimal amount. The sign is kept as given;
/// out-of-range magnitudes count as unparseable.
pub fn parse_amount(cell: &Cell) -> Option<Decimal> {
    let amount = match cell {
        Cell::Number(n) if n.is_finite() => Decimal::try_from(*n).ok().map(|d| d.normalize()),
        Cell::Text(s) => parse_amount_text(s),
        Cell::Number(_) | Cell::Empty | Cell::Bool(_) => None,
    }?;
    (amount.abs() < Decimal::from(MAX_ABS_AMOUNT)).then_some(amount)
}

fn column_text(row: &[Cell], column: Option<&ColumnRef>) -> Option<String> {
    column
        .and_then(|c| row.get(c.index))
        .and_then(Cell::as_text)
}

/// Turn a raw table into typed transactions under the given policy.
///
/// When no category column was resolved, each row's description text is
/// looked up in `keywords`.
pub fn normalize(
    raw: &RawTable,
    roles: &ColumnRoleMap,
    policy: SignPolicy,
    keywords: &KeywordMap,
) -> NormalizedTable {
    let mut transactions = Vec::with_capacity(raw.len());
    let mut drops = DropReport::default();

    for (row_num, row) in raw.rows().iter().enumerate() {
        let Some(date) = row.get(roles.date.index).and_then(parse_date) else {
            debug!("Dropping row {}: unparseable date", row_num + 1);
            drops.bad_date += 1;
            continue;
        };
        let Some(amount) = row.get(roles.amount.index).and_then(parse_amount) else {
            debug!("Dropping row {}: unparseable amount", row_num + 1);
            drops.bad_amount += 1;
            continue;
        };

        let description = column_text(row, roles.description.as_ref());
        let category = match &roles.category {
            Some(col) => column_text(row, Some(col)).unwrap_or_else(|| UNCATEGORIZED.to_string()),
            None => keywords.categorize(description.as_deref()),
        };
        let tx_type = column_text(row, roles.tx_type.as_ref()).map(|t| t.to_lowercase());

        transactions.push(Transaction {
            date,
            amount,
            category,
            tx_type,
            description,
        });
    }

    if drops.total() > 0 {
        debug!(
            "Dropped {} of {} rows ({} bad date, {} bad amount)",
            drops.total(),
            raw.len(),
            drops.bad_date,
            drops.bad_amount
        );
    }

    NormalizedTable {
        transactions,
        policy,
        has_type_column: roles.tx_type.is_some(),
        drops,
    }
}
