//! Headline metrics: total income, total expenses and net savings
//!
//! How a row counts toward income or expenses depends on the table's
//! [`SignPolicy`]. A table is normalized under exactly one policy and
//! metrics must be computed under that same policy.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{MetricsRecord, NormalizedTable, SignPolicy, TxKind};

/// Pick the policy for a run. Without a request, a resolved Type column
/// selects `TypeKeyed`; a forced `TypeKeyed` needs that column.
pub fn select_policy(has_type_column: bool, requested: Option<SignPolicy>) -> Result<SignPolicy> {
    match requested {
        Some(SignPolicy::TypeKeyed) if !has_type_column => {
            Err(Error::PolicyUnavailable(SignPolicy::TypeKeyed))
        }
        Some(policy) => Ok(policy),
        None if has_type_column => Ok(SignPolicy::TypeKeyed),
        None => Ok(SignPolicy::SignKeyed),
    }
}

/// Net savings as a percentage of income, `None` when there is no income
fn savings_rate(income: Decimal, net: Decimal) -> Option<Decimal> {
    if income <= Decimal::ZERO {
        return None;
    }
    let rate = net.checked_div(income)?.checked_mul(Decimal::ONE_HUNDRED)?;
    Some(rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Compute metrics under `policy`, which must match the policy the table
/// was normalized with
pub fn compute_metrics(table: &NormalizedTable, policy: SignPolicy) -> Result<MetricsRecord> {
    if table.policy != policy {
        return Err(Error::PolicyMismatch {
            table: table.policy,
            requested: policy,
        });
    }
    Ok(tally(table, policy))
}

/// Compute metrics under the policy stamped on the table
pub fn metrics(table: &NormalizedTable) -> MetricsRecord {
    tally(table, table.policy)
}

fn tally(table: &NormalizedTable, policy: SignPolicy) -> MetricsRecord {
    let (income, expense) = match policy {
        SignPolicy::TypeKeyed => {
            table
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(inc, exp), tx| match tx.kind() {
                    TxKind::Income => (inc + tx.amount, exp),
                    TxKind::Expense => (inc, exp + tx.amount),
                    TxKind::Unknown => (inc, exp),
                })
        }
        SignPolicy::SignKeyed => table.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(inc, exp), tx| {
                if tx.amount > Decimal::ZERO {
                    (inc + tx.amount, exp)
                } else {
                    (inc, exp + tx.amount)
                }
            },
        ),
    };

    let expenses = expense.abs();
    let net = income - expenses;
    debug!(
        "Metrics under {}: income={} expenses={} net={}",
        policy, income, expenses, net
    );

    MetricsRecord {
        total_income: income,
        total_expenses: expenses,
        net_savings: net,
        savings_rate: savings_rate(income, net),
        policy,
    }
}
