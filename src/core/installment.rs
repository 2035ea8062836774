//! Installment business logic - purchases split into monthly parts.
//!
//! An installment and its child transactions are one unit. They are created in
//! a single database transaction and deleted in a single database transaction;
//! no reader ever sees a parent without its parts or parts without their parent.

use crate::{
    core::{caller::Caller, category, transaction::validate_description},
    entities::{FixedKind, Installment, Transaction, TransactionType, installment, transaction},
    errors::{Error, Result},
};
use chrono::{Months, NaiveDate};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Input for [`create_installment`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewInstallment {
    pub description: String,
    /// Full purchase price, unsigned
    pub total_amount: f64,
    pub total_installments: i32,
    /// Date of the first part; later parts fall on the same day of following months
    pub start_date: NaiveDate,
    pub origin: String,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// An installment together with its parts ordered by `current_installment`.
#[derive(Debug, Clone, Serialize)]
pub struct InstallmentWithTransactions {
    pub installment: installment::Model,
    pub transactions: Vec<transaction::Model>,
}

fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Splits `total` into `count` parts of `round(total / count)`, with the last
/// part absorbing the rounding remainder.
fn split_amount(total: f64, count: i32) -> Vec<f64> {
    let nominal = round_to_cents(total / f64::from(count));
    let mut parts = vec![nominal; usize::try_from(count).unwrap_or(0)];
    if let Some(last) = parts.last_mut() {
        *last = round_to_cents(total - nominal * f64::from(count - 1));
    }
    parts
}

/// Largest number of parts a purchase can be split into (30 years of months).
pub const MAX_INSTALLMENTS: i32 = 360;

fn part_date(start: NaiveDate, index: u32) -> Result<NaiveDate> {
    start
        .checked_add_months(Months::new(index))
        .ok_or_else(|| {
            Error::validation(format!(
                "installment part {} falls outside the supported date range",
                index + 1
            ))
        })
}

/// Creates an installment and its `total_installments` expense transactions.
pub async fn create_installment(
    db: &DatabaseConnection,
    caller: &Caller,
    input: NewInstallment,
) -> Result<InstallmentWithTransactions> {
    let description = validate_description(&input.description)?;
    if input.total_amount <= 0.0 || !input.total_amount.is_finite() {
        return Err(Error::InvalidAmount {
            amount: input.total_amount,
        });
    }
    if !(1..=MAX_INSTALLMENTS).contains(&input.total_installments) {
        return Err(Error::validation(format!(
            "an installment needs between 1 and {MAX_INSTALLMENTS} parts"
        )));
    }
    let last_index = u32::try_from(input.total_installments - 1).unwrap_or_default();
    part_date(input.start_date, last_index)?;

    let txn = db.begin().await?;
    if let Some(category_id) = input.category_id {
        category::ensure_category_owned(&txn, caller, category_id).await?;
    }

    let parts = split_amount(input.total_amount, input.total_installments);
    let origin = input.origin.trim().to_string();
    let now = chrono::Utc::now();

    let parent = installment::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        description: Set(description.clone()),
        total_amount: Set(input.total_amount),
        total_installments: Set(input.total_installments),
        installment_amount: Set(parts[0]),
        start_date: Set(input.start_date),
        origin: Set(origin.clone()),
        category_id: Set(input.category_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut transactions = Vec::with_capacity(parts.len());
    for (index, amount) in (0u32..).zip(parts) {
        let number = index + 1;
        let child = transaction::ActiveModel {
            user_id: Set(caller.user_id().to_string()),
            description: Set(format!(
                "{description} ({number}/{})",
                input.total_installments
            )),
            amount: Set(TransactionType::Expense.signed(amount)),
            date: Set(part_date(input.start_date, index)?),
            transaction_type: Set(TransactionType::Expense),
            origin: Set(origin.clone()),
            category_id: Set(input.category_id),
            fixed_kind: Set(FixedKind::None),
            is_installment: Set(true),
            installment_id: Set(Some(parent.id)),
            current_installment: Set(Some(i32::try_from(number).unwrap_or(i32::MAX))),
            recurring_expense_id: Set(None),
            recurrence_month: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        transactions.push(child);
    }

    txn.commit().await?;
    info!(
        "Created installment {} '{}' with {} parts for {}",
        parent.id,
        parent.description,
        transactions.len(),
        caller.user_id()
    );

    Ok(InstallmentWithTransactions {
        installment: parent,
        transactions,
    })
}

async fn find_owned<C>(db: &C, caller: &Caller, installment_id: i64) -> Result<installment::Model>
where
    C: ConnectionTrait,
{
    Installment::find_by_id(installment_id)
        .filter(installment::Column::UserId.eq(caller.user_id()))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Installment",
            id: installment_id,
        })
}

/// Retrieves an installment and its parts.
pub async fn get_installment(
    db: &DatabaseConnection,
    caller: &Caller,
    installment_id: i64,
) -> Result<InstallmentWithTransactions> {
    let installment = find_owned(db, caller, installment_id).await?;
    let transactions = Transaction::find()
        .filter(transaction::Column::InstallmentId.eq(installment_id))
        .order_by_asc(transaction::Column::CurrentInstallment)
        .all(db)
        .await?;

    Ok(InstallmentWithTransactions {
        installment,
        transactions,
    })
}

/// Lists the caller's installments, most recent start date first.
pub async fn list_installments(
    db: &DatabaseConnection,
    caller: &Caller,
) -> Result<Vec<installment::Model>> {
    let installments = Installment::find()
        .filter(installment::Column::UserId.eq(caller.user_id()))
        .order_by_desc(installment::Column::StartDate)
        .order_by_desc(installment::Column::Id)
        .all(db)
        .await?;
    debug!("Listed {} installments for {}", installments.len(), caller.user_id());
    Ok(installments)
}

/// Deletes an installment and every transaction that belongs to it.
///
/// Returns how many child transactions were removed.
pub async fn delete_installment(
    db: &DatabaseConnection,
    caller: &Caller,
    installment_id: i64,
) -> Result<u64> {
    let txn = db.begin().await?;
    let installment = find_owned(&txn, caller, installment_id).await?;

    let removed = Transaction::delete_many()
        .filter(transaction::Column::InstallmentId.eq(installment_id))
        .exec(&txn)
        .await?
        .rows_affected;
    installment.delete(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted installment {installment_id} and {removed} transactions for {}",
        caller.user_id()
    );
    Ok(removed)
}
