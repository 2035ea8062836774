//! Report generation business logic.
//!
//! This module aggregates an account's transactions into monthly summaries and a
//! yearly overview. All functions are framework-agnostic and return structured
//! data that the HTTP layer serializes as-is.

use crate::{
    core::{caller::Caller, category, period::Period},
    entities::{Transaction, TransactionType, transaction},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Label used for expenses without a category.
pub const UNCATEGORIZED_LABEL: &str = "Sem categoria";

/// Expense total of one category or origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    /// Category id, `None` for uncategorized and for origin groups
    pub category_id: Option<i64>,
    pub name: String,
    /// Unsigned sum of the group's expenses
    pub total: f64,
    /// Share of the month's expenses (0-100)
    pub percent: f64,
}

/// Represents a month of income and spending for an account.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub period: Period,
    pub income: f64,
    /// Unsigned sum of expenses
    pub expenses: f64,
    /// `income - expenses`
    pub balance: f64,
    /// Part of `expenses` coming from fixed transactions
    pub fixed_expenses: f64,
    /// Expenses grouped by category, largest first
    pub by_category: Vec<GroupTotal>,
    /// Expenses grouped by origin, largest first
    pub by_origin: Vec<GroupTotal>,
}

/// Income and expenses of one month in a [`yearly_overview`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotals {
    pub month: u32,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Calculates the share of `part` in `whole` as a percentage.
///
/// Returns 0 when `whole` is zero so empty months do not divide by zero.
#[must_use]
pub fn calculate_percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }

    round_to_cents(part / whole * 100.0)
}

fn into_groups(totals: HashMap<(Option<i64>, String), f64>, expenses: f64) -> Vec<GroupTotal> {
    let mut groups: Vec<GroupTotal> = totals
        .into_iter()
        .map(|((category_id, name), total)| GroupTotal {
            category_id,
            name,
            total: round_to_cents(total),
            percent: calculate_percent(total, expenses),
        })
        .collect();
    groups.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    groups
}

async fn transactions_in(
    db: &DatabaseConnection,
    caller: &Caller,
    first_day: Date,
    last_day: Date,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(caller.user_id()))
        .filter(transaction::Column::Date.between(first_day, last_day))
        .order_by_asc(transaction::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Builds the income and spending summary of one month.
pub async fn monthly_summary(
    db: &DatabaseConnection,
    caller: &Caller,
    month: u32,
    year: i32,
) -> Result<MonthlySummary> {
    let period = Period::new(month, year)?;
    let transactions = transactions_in(db, caller, period.first_day(), period.last_day()).await?;
    let names: HashMap<i64, String> = category::list_categories(db, caller)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut income = 0.0;
    let mut expenses = 0.0;
    let mut fixed_expenses = 0.0;
    let mut by_category: HashMap<(Option<i64>, String), f64> = HashMap::new();
    let mut by_origin: HashMap<(Option<i64>, String), f64> = HashMap::new();

    for t in &transactions {
        match t.transaction_type {
            TransactionType::Income => income += t.amount.abs(),
            TransactionType::Expense => {
                let spent = t.amount.abs();
                expenses += spent;
                if t.is_fixed() {
                    fixed_expenses += spent;
                }

                let category_name = t
                    .category_id
                    .and_then(|id| names.get(&id).cloned())
                    .unwrap_or_else(|| UNCATEGORIZED_LABEL.to_string());
                let category_key = t.category_id.filter(|id| names.contains_key(id));
                *by_category.entry((category_key, category_name)).or_default() += spent;
                *by_origin.entry((None, t.origin.clone())).or_default() += spent;
            }
        }
    }

    debug!(
        "Summarized {} transactions of {period} for {}",
        transactions.len(),
        caller.user_id()
    );

    Ok(MonthlySummary {
        period,
        income: round_to_cents(income),
        expenses: round_to_cents(expenses),
        balance: round_to_cents(income - expenses),
        fixed_expenses: round_to_cents(fixed_expenses),
        by_category: into_groups(by_category, expenses),
        by_origin: into_groups(by_origin, expenses),
    })
}

/// Builds income, expense and balance totals for all twelve months of `year`.
pub async fn yearly_overview(
    db: &DatabaseConnection,
    caller: &Caller,
    year: i32,
) -> Result<Vec<MonthTotals>> {
    let january = Period::new(1, year)?;
    let december = Period::new(12, year)?;
    let transactions =
        transactions_in(db, caller, january.first_day(), december.last_day()).await?;

    let mut months: Vec<MonthTotals> = (1..=12)
        .map(|month| MonthTotals {
            month,
            income: 0.0,
            expenses: 0.0,
            balance: 0.0,
        })
        .collect();

    for t in &transactions {
        let index = usize::try_from(Period::of(t.date).month()).unwrap_or(1) - 1;
        let Some(totals) = months.get_mut(index) else {
            continue;
        };
        match t.transaction_type {
            TransactionType::Income => totals.income += t.amount.abs(),
            TransactionType::Expense => totals.expenses += t.amount.abs(),
        }
    }

    for totals in &mut months {
        totals.balance = round_to_cents(totals.income - totals.expenses);
        totals.income = round_to_cents(totals.income);
        totals.expenses = round_to_cents(totals.expenses);
    }

    Ok(months)
}
