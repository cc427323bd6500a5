//! Revenue / expense / profit rollup over transactions.

use crate::domain::{Transaction, TransactionKind};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FinancialSummary {
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
}

/// First instant (00:00 UTC) of the month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

/// Month-to-date rollup. The boundary is computed once from `now`, never per row.
pub fn summarize_month(transactions: &[Transaction], now: DateTime<Utc>) -> FinancialSummary {
    summarize_since(transactions, month_start(now))
}

/// Rollup over rows with `date >= since`; older rows are excluded entirely.
pub fn summarize_since(transactions: &[Transaction], since: DateTime<Utc>) -> FinancialSummary {
    fold(transactions.iter().filter(|t| t.date >= since))
}

/// All-time totals, as shown on the finances page.
pub fn summarize_all(transactions: &[Transaction]) -> FinancialSummary {
    fold(transactions.iter())
}

fn fold<'a>(rows: impl Iterator<Item = &'a Transaction>) -> FinancialSummary {
    let (revenue, expenses) = rows.fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(revenue, expenses), t| match t.kind {
            TransactionKind::Sale => (revenue + t.amount, expenses),
            TransactionKind::Expense => (revenue, expenses + t.amount),
        },
    );
    FinancialSummary {
        revenue,
        expenses,
        profit: revenue - expenses,
    }
}
