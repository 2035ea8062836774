//! Monthly generation of recurring expenses.
//!
//! Materializes every active auto-generate template of an account for one month.
//! Templates that already have a transaction in the month are skipped, so the
//! sweep can be repeated safely. The month of the last sweep is kept in the
//! account's `last_auto_generation` setting so the UI can tell whether the
//! current month still needs one.

use crate::{
    core::{caller::Caller, period::Period, recurring, settings},
    entities::{RecurringExpense, recurring_expense, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::info;

const LAST_AUTO_GENERATION_KEY: &str = "last_auto_generation";

/// Represents the result of a monthly generation for all templates of an account.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    /// Month the sweep ran for
    pub period: Period,
    /// Transactions created by this sweep
    pub generated: Vec<transaction::Model>,
    /// Templates skipped because the month already had their transaction
    pub already_present: usize,
}

/// Retrieves the month of the last sweep from the account's settings.
pub async fn get_last_generation_period<C>(db: &C, caller: &Caller) -> Result<Option<Period>>
where
    C: ConnectionTrait,
{
    settings::get_setting(db, caller, LAST_AUTO_GENERATION_KEY)
        .await?
        .map(|value| Period::parse_key(&value))
        .transpose()
}

/// Checks if a sweep is needed by comparing the last swept month with `today`.
/// Returns true if no sweep has been recorded or the recorded month is older.
pub async fn is_generation_due<C>(db: &C, caller: &Caller, today: NaiveDate) -> Result<bool>
where
    C: ConnectionTrait,
{
    let last = get_last_generation_period(db, caller).await?;
    Ok(last.is_none_or(|period| period < Period::of(today)))
}

/// Generates the month's transaction for every active auto-generate template
/// that does not have one yet. All inserts and the bookkeeping setting are
/// written in one database transaction.
pub async fn generate_due(
    db: &DatabaseConnection,
    caller: &Caller,
    month: u32,
    year: i32,
) -> Result<GenerationSummary> {
    let period = Period::new(month, year)?;

    // Start a database transaction to ensure atomicity
    let txn = db.begin().await?;

    let templates = RecurringExpense::find()
        .filter(recurring_expense::Column::UserId.eq(caller.user_id()))
        .filter(recurring_expense::Column::IsActive.eq(true))
        .filter(recurring_expense::Column::AutoGenerate.eq(true))
        .order_by_asc(recurring_expense::Column::Id)
        .all(&txn)
        .await?;

    let mut generated = Vec::new();
    let mut already_present = 0;

    for template in &templates {
        match recurring::materialize(&txn, caller, template, period, None).await {
            Ok(created) => generated.push(created),
            Err(Error::Conflict { .. }) => already_present += 1,
            Err(err) => return Err(err),
        }
    }

    // Only move the marker forward; sweeping an old month must not hide the current one
    let last = get_last_generation_period(&txn, caller).await?;
    if last.is_none_or(|recorded| recorded < period) {
        settings::set_setting(&txn, caller, LAST_AUTO_GENERATION_KEY, &period.key()).await?;
    }

    // Commit the transaction - all inserts succeed or all fail
    txn.commit().await?;

    info!(
        "Auto-generation for {} in {period}: {} created, {already_present} already present",
        caller.user_id(),
        generated.len()
    );

    Ok(GenerationSummary {
        period,
        generated,
        already_present,
    })
}
