//! Promotion of a one-off transaction into a recurring expense.
//!
//! The template snapshot and the back-link on the source transaction are written
//! in one database transaction: either both exist afterwards or neither does.

use crate::{
    core::{
        caller::Caller,
        period::{Period, clamp_day_of_month},
        recurring::validate_template_amount,
        transaction::get_transaction,
    },
    entities::{FixedKind, recurring_expense, transaction},
    errors::{Error, Result},
};
use chrono::Datelike;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, warn};

/// The template created by [`promote`] and the source transaction now linked to it.
#[derive(Debug, Clone, Serialize)]
pub struct Promotion {
    pub template: recurring_expense::Model,
    pub transaction: transaction::Model,
}

/// Turns an existing transaction into a recurring expense template.
///
/// `day_of_month` defaults to the transaction's own day and is clamped to
/// `[1, 31]`.
///
/// # Errors
/// - `NotFound` if the transaction does not exist for the caller
/// - `AlreadyLinked` if it already belongs to a recurring expense
/// - `IncompatibleKind` if it is part of an installment
pub async fn promote(
    db: &DatabaseConnection,
    caller: &Caller,
    transaction_id: i64,
    day_of_month: Option<i32>,
    auto_generate: bool,
) -> Result<Promotion> {
    let txn = db.begin().await?;

    let source = get_transaction(&txn, caller, transaction_id).await?;

    if let Some(recurring_expense_id) = source.recurring_expense_id {
        warn!("Transaction {transaction_id} is already linked to recurring expense {recurring_expense_id}");
        return Err(Error::AlreadyLinked {
            transaction_id,
            recurring_expense_id,
        });
    }
    if source.belongs_to_installment() {
        warn!("Transaction {transaction_id} is an installment part and cannot become recurring");
        return Err(Error::IncompatibleKind { transaction_id });
    }

    let day = clamp_day_of_month(
        day_of_month.unwrap_or_else(|| i32::try_from(source.date.day()).unwrap_or(1)),
    );
    let default_amount = validate_template_amount(source.amount.abs())?;
    let period = Period::of(source.date);

    let template = recurring_expense::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        description: Set(source.description.clone()),
        default_amount: Set(default_amount),
        day_of_month: Set(day),
        transaction_type: Set(source.transaction_type),
        origin: Set(source.origin.clone()),
        category_id: Set(source.category_id),
        is_active: Set(true),
        auto_generate: Set(auto_generate),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // A manually fixed row stays MANUAL so unlinking it later keeps the flag
    let fixed_kind = match source.fixed_kind {
        FixedKind::Manual => FixedKind::Manual,
        FixedKind::None | FixedKind::Recurring => FixedKind::Recurring,
    };
    let mut linked: transaction::ActiveModel = source.into();
    linked.recurring_expense_id = Set(Some(template.id));
    linked.recurrence_month = Set(Some(period.key()));
    linked.fixed_kind = Set(fixed_kind);
    let transaction = linked.update(&txn).await?;

    txn.commit().await?;

    info!(
        "Promoted transaction {transaction_id} to recurring expense {} for {}",
        template.id,
        caller.user_id()
    );
    Ok(Promotion {
        template,
        transaction,
    })
}
