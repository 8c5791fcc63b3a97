//! Aggregate views over a normalized table
//!
//! Every view is recomputed from the table on each call; nothing is cached
//! and the table is never modified.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{
    CategoryTotal, CumulativePoint, IncomeExpenseTotals, NormalizedTable, Panel, PeriodTotal,
    TxKind,
};

/// Number of categories in the top-N view when the caller doesn't say
pub const DEFAULT_TOP_N: usize = 5;

/// Sum of amounts per category, in the order categories first appear
pub fn category_totals(table: &NormalizedTable) -> Vec<CategoryTotal> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for tx in table.iter() {
        match positions.get(tx.category.as_str()) {
            Some(&i) => totals[i].total += tx.amount,
            None => {
                positions.insert(tx.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: tx.category.clone(),
                    total: tx.amount,
                });
            }
        }
    }
    totals
}

fn period_totals<F>(table: &NormalizedTable, start_of: F, label: &str) -> Vec<PeriodTotal>
where
    F: Fn(NaiveDate) -> NaiveDate,
{
    let mut buckets: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for tx in table.iter() {
        *buckets.entry(start_of(tx.date)).or_default() += tx.amount;
    }
    buckets
        .into_iter()
        .map(|(start, total)| PeriodTotal {
            period: start.format(label).to_string(),
            start,
            total,
        })
        .collect()
}

/// Sum of amounts per calendar month, oldest first
pub fn monthly_totals(table: &NormalizedTable) -> Vec<PeriodTotal> {
    period_totals(table, |d| d.with_day(1).unwrap_or(d), "%Y-%m")
}

/// Sum of amounts per calendar day, oldest first
pub fn daily_totals(table: &NormalizedTable) -> Vec<PeriodTotal> {
    period_totals(table, |d| d, "%Y-%m-%d")
}

/// The `n` categories with the largest absolute totals. Ties keep
/// first-seen order.
pub fn top_categories(table: &NormalizedTable, n: usize) -> Vec<CategoryTotal> {
    let mut totals = category_totals(table);
    // sort_by is stable, so equal magnitudes stay in first-seen order
    totals.sort_by(|a, b| b.total.abs().cmp(&a.total.abs()));
    totals.truncate(n);
    totals
}

/// Totals of rows typed "income" and "expense"; other types count toward
/// neither
pub fn income_vs_expense(table: &NormalizedTable) -> IncomeExpenseTotals {
    table
        .iter()
        .fold(IncomeExpenseTotals::default(), |mut acc, tx| {
            match tx.kind() {
                TxKind::Income => acc.income += tx.amount,
                TxKind::Expense => acc.expense += tx.amount,
                TxKind::Unknown => {}
            }
            acc
        })
}

/// Running balance in table order. Sort the table first with
/// [`NormalizedTable::sorted_by_date`] for a chronological series.
pub fn cumulative(table: &NormalizedTable) -> Vec<CumulativePoint> {
    let mut balance = Decimal::ZERO;
    table
        .iter()
        .map(|tx| {
            balance += tx.amount;
            CumulativePoint {
                date: tx.date,
                amount: tx.amount,
                balance,
            }
        })
        .collect()
}

/// The six dashboard panels, each either ready to draw or marked empty
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub category_totals: Panel<Vec<CategoryTotal>>,
    pub monthly_totals: Panel<Vec<PeriodTotal>>,
    pub income_vs_expense: Panel<IncomeExpenseTotals>,
    pub daily_totals: Panel<Vec<PeriodTotal>>,
    pub top_categories: Panel<Vec<CategoryTotal>>,
    pub cumulative: Panel<Vec<CumulativePoint>>,
}

impl Dashboard {
    pub fn build(table: &NormalizedTable, top_n: usize) -> Self {
        let income_vs_expense = income_vs_expense(table);
        Self {
            category_totals: Panel::from_vec(category_totals(table)),
            monthly_totals: Panel::from_vec(monthly_totals(table)),
            income_vs_expense: if table.has_type_column && !income_vs_expense.is_empty() {
                Panel::Ready(income_vs_expense)
            } else {
                Panel::NoData
            },
            daily_totals: Panel::from_vec(daily_totals(table)),
            top_categories: Panel::from_vec(top_categories(table, top_n)),
            cumulative: Panel::from_vec(cumulative(&table.sorted_by_date())),
        }
    }

    /// Number of panels that have data
    pub fn ready_count(&self) -> usize {
        [
            self.category_totals.is_ready(),
            self.monthly_totals.is_ready(),
            self.income_vs_expense.is_ready(),
            self.daily_totals.is_ready(),
            self.top_categories.is_ready(),
            self.cumulative.is_ready(),
        ]
        .iter()
        .filter(|ready| **ready)
        .count()
    }
}
