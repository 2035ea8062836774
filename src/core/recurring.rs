//! Recurring expense business logic - templates and the transactions materialized from them.
//!
//! A recurring expense is a monthly template. For each month it may be turned into
//! exactly one concrete transaction:
//!
//! - templates with `auto_generate` are materialized on demand ([`generate`]) or by the
//!   monthly sweep (`core::monthly`);
//! - manual templates wait for an external event such as a bank-statement import and
//!   show up in [`list_pending`] until a transaction for the month exists.
//!
//! "One per month" is checked before inserting and backed by the unique
//! `(recurring_expense_id, recurrence_month)` index, so a concurrent duplicate is
//! reported as a conflict instead of being stored.

use crate::{
    core::{
        caller::Caller,
        category,
        period::{Period, clamp_day_of_month},
        transaction::{find_in_recurrence_month, validate_description},
    },
    entities::{
        FixedKind, RecurringExpense, Transaction, TransactionType, recurring_expense, transaction,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Input for [`create_recurring_expense`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecurringExpense {
    pub description: String,
    pub default_amount: f64,
    pub day_of_month: i32,
    pub transaction_type: TransactionType,
    pub origin: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default = "default_true")]
    pub auto_generate: bool,
}

const fn default_true() -> bool {
    true
}

/// Partial update for [`update_recurring_expense`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurringExpenseUpdate {
    pub description: Option<String>,
    pub default_amount: Option<f64>,
    pub day_of_month: Option<i32>,
    pub transaction_type: Option<TransactionType>,
    pub origin: Option<String>,
    /// `Some(None)` clears the category
    #[serde(default, with = "crate::core::transaction::double_option")]
    pub category_id: Option<Option<i64>>,
    pub is_active: Option<bool>,
    pub auto_generate: Option<bool>,
}

/// A manual template still waiting for its transaction in a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingItem {
    pub recurring_expense_id: i64,
    pub description: String,
    /// Signed amount the transaction is expected to have
    pub expected_amount: f64,
    /// Template day clamped to the month
    pub expected_date: NaiveDate,
    pub transaction_type: TransactionType,
    pub origin: String,
    pub category_id: Option<i64>,
}

pub(crate) fn validate_template_amount(amount: f64) -> Result<f64> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Creates a recurring expense template. `day_of_month` is clamped to `[1, 31]`.
pub async fn create_recurring_expense(
    db: &DatabaseConnection,
    caller: &Caller,
    input: NewRecurringExpense,
) -> Result<recurring_expense::Model> {
    let description = validate_description(&input.description)?;
    let default_amount = validate_template_amount(input.default_amount)?;
    if let Some(category_id) = input.category_id {
        category::ensure_category_owned(db, caller, category_id).await?;
    }

    let model = recurring_expense::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        description: Set(description),
        default_amount: Set(default_amount),
        day_of_month: Set(clamp_day_of_month(input.day_of_month)),
        transaction_type: Set(input.transaction_type),
        origin: Set(input.origin.trim().to_string()),
        category_id: Set(input.category_id),
        is_active: Set(true),
        auto_generate: Set(input.auto_generate),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(
        "Created recurring expense {} '{}' for {}",
        created.id,
        created.description,
        caller.user_id()
    );
    Ok(created)
}

/// Retrieves a template owned by the caller.
pub async fn get_recurring_expense<C>(
    db: &C,
    caller: &Caller,
    recurring_expense_id: i64,
) -> Result<recurring_expense::Model>
where
    C: ConnectionTrait,
{
    RecurringExpense::find_by_id(recurring_expense_id)
        .filter(recurring_expense::Column::UserId.eq(caller.user_id()))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "RecurringExpense",
            id: recurring_expense_id,
        })
}

/// Lists the caller's templates ordered by day of month, then description.
pub async fn list_recurring_expenses(
    db: &DatabaseConnection,
    caller: &Caller,
) -> Result<Vec<recurring_expense::Model>> {
    RecurringExpense::find()
        .filter(recurring_expense::Column::UserId.eq(caller.user_id()))
        .order_by_asc(recurring_expense::Column::DayOfMonth)
        .order_by_asc(recurring_expense::Column::Description)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to a template. Setting `is_active` to false is how a
/// template is retired without losing its history.
pub async fn update_recurring_expense(
    db: &DatabaseConnection,
    caller: &Caller,
    recurring_expense_id: i64,
    update: RecurringExpenseUpdate,
) -> Result<recurring_expense::Model> {
    let existing = get_recurring_expense(db, caller, recurring_expense_id).await?;
    let mut active_model: recurring_expense::ActiveModel = existing.into();

    if let Some(description) = update.description {
        active_model.description = Set(validate_description(&description)?);
    }
    if let Some(amount) = update.default_amount {
        active_model.default_amount = Set(validate_template_amount(amount)?);
    }
    if let Some(day) = update.day_of_month {
        active_model.day_of_month = Set(clamp_day_of_month(day));
    }
    if let Some(transaction_type) = update.transaction_type {
        active_model.transaction_type = Set(transaction_type);
    }
    if let Some(origin) = update.origin {
        active_model.origin = Set(origin.trim().to_string());
    }
    if let Some(category_id) = update.category_id {
        if let Some(id) = category_id {
            category::ensure_category_owned(db, caller, id).await?;
        }
        active_model.category_id = Set(category_id);
    }
    if let Some(is_active) = update.is_active {
        active_model.is_active = Set(is_active);
    }
    if let Some(auto_generate) = update.auto_generate {
        active_model.auto_generate = Set(auto_generate);
    }

    let updated = active_model.update(db).await?;
    info!(
        "Updated recurring expense {recurring_expense_id} for {}",
        caller.user_id()
    );
    Ok(updated)
}

/// Deletes a template after unlinking every transaction generated from it.
///
/// Unlinked transactions that were fixed only because of the template go back to
/// not fixed; manually fixed ones keep their flag. Returns how many transactions
/// were unlinked.
pub async fn delete_recurring_expense(
    db: &DatabaseConnection,
    caller: &Caller,
    recurring_expense_id: i64,
) -> Result<u64> {
    let txn = db.begin().await?;
    let template = get_recurring_expense(&txn, caller, recurring_expense_id).await?;

    Transaction::update_many()
        .col_expr(transaction::Column::FixedKind, Expr::value(FixedKind::None))
        .filter(transaction::Column::RecurringExpenseId.eq(recurring_expense_id))
        .filter(transaction::Column::FixedKind.eq(FixedKind::Recurring))
        .exec(&txn)
        .await?;
    let unlinked = Transaction::update_many()
        .col_expr(
            transaction::Column::RecurringExpenseId,
            Expr::value(Option::<i64>::None),
        )
        .col_expr(
            transaction::Column::RecurrenceMonth,
            Expr::value(Option::<String>::None),
        )
        .filter(transaction::Column::RecurringExpenseId.eq(recurring_expense_id))
        .exec(&txn)
        .await?
        .rows_affected;
    template.delete(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted recurring expense {recurring_expense_id} for {} ({unlinked} transactions unlinked)",
        caller.user_id()
    );
    Ok(unlinked)
}

/// Inserts the transaction for `template` in `period` unless one already exists.
///
/// Shared by [`generate`] and the monthly sweep; the caller has already checked
/// ownership and the template's policy.
pub(crate) async fn materialize<C>(
    db: &C,
    caller: &Caller,
    template: &recurring_expense::Model,
    period: Period,
    amount_override: Option<f64>,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_in_recurrence_month(db, caller, template.id, period, None).await? {
        warn!(
            "Recurring expense {} already generated for {period} (transaction {})",
            template.id, existing.id
        );
        return Err(Error::Conflict {
            recurring_expense_id: template.id,
            period: period.key(),
            existing: Box::new(existing),
        });
    }

    let amount = amount_override.unwrap_or(template.default_amount);
    let model = transaction::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        description: Set(template.description.clone()),
        amount: Set(template.transaction_type.signed(amount)),
        date: Set(period.clamped_date(template.day_of_month)),
        transaction_type: Set(template.transaction_type),
        origin: Set(template.origin.clone()),
        category_id: Set(template.category_id),
        fixed_kind: Set(FixedKind::Recurring),
        is_installment: Set(false),
        installment_id: Set(None),
        current_installment: Set(None),
        recurring_expense_id: Set(Some(template.id)),
        recurrence_month: Set(Some(period.key())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(created) => Ok(created),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            // Lost a race with a concurrent generation for the same month.
            warn!(
                "Unique index rejected duplicate generation of recurring expense {} for {period}",
                template.id
            );
            let existing = find_in_recurrence_month(db, caller, template.id, period, None)
                .await?
                .ok_or(Error::Database(err))?;
            Err(Error::Conflict {
                recurring_expense_id: template.id,
                period: period.key(),
                existing: Box::new(existing),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Materializes the transaction of an auto-generate template for one month.
///
/// # Errors
/// - `NotFound` if the template does not exist for the caller
/// - `PolicyViolation` if the template is manual (`auto_generate == false`)
/// - `Conflict` (with the existing transaction) if the month is already covered
/// - `InvalidAmount` if `amount_override` is not a positive finite number
pub async fn generate(
    db: &DatabaseConnection,
    caller: &Caller,
    recurring_expense_id: i64,
    month: u32,
    year: i32,
    amount_override: Option<f64>,
) -> Result<transaction::Model> {
    let period = Period::new(month, year)?;
    let amount_override = amount_override.map(validate_template_amount).transpose()?;
    let template = get_recurring_expense(db, caller, recurring_expense_id).await?;

    if !template.auto_generate {
        warn!("Refusing to generate manual recurring expense {recurring_expense_id}");
        return Err(Error::PolicyViolation {
            message: format!(
                "recurring expense '{}' is generated from bank statement imports",
                template.description
            ),
            hint: "enable auto-generate on this recurring expense to generate it on demand"
                .to_string(),
        });
    }

    let created = materialize(db, caller, &template, period, amount_override).await?;
    info!(
        "Generated transaction {} from recurring expense {recurring_expense_id} for {period}",
        created.id
    );
    Ok(created)
}

/// Lists active manual templates that have no transaction dated within the month.
pub async fn list_pending(
    db: &DatabaseConnection,
    caller: &Caller,
    month: u32,
    year: i32,
) -> Result<Vec<PendingItem>> {
    let period = Period::new(month, year)?;

    let templates = RecurringExpense::find()
        .filter(recurring_expense::Column::UserId.eq(caller.user_id()))
        .filter(recurring_expense::Column::IsActive.eq(true))
        .filter(recurring_expense::Column::AutoGenerate.eq(false))
        .order_by_asc(recurring_expense::Column::DayOfMonth)
        .order_by_asc(recurring_expense::Column::Id)
        .all(db)
        .await?;

    let covered: HashSet<i64> = Transaction::find()
        .filter(transaction::Column::UserId.eq(caller.user_id()))
        .filter(transaction::Column::RecurringExpenseId.is_not_null())
        .filter(transaction::Column::Date.between(period.first_day(), period.last_day()))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|t| t.recurring_expense_id)
        .collect();

    let pending: Vec<PendingItem> = templates
        .into_iter()
        .filter(|template| !covered.contains(&template.id))
        .map(|template| PendingItem {
            recurring_expense_id: template.id,
            expected_amount: template.transaction_type.signed(template.default_amount),
            expected_date: period.clamped_date(template.day_of_month),
            description: template.description,
            transaction_type: template.transaction_type,
            origin: template.origin,
            category_id: template.category_id,
        })
        .collect();

    debug!(
        "{} pending recurring expenses for {} in {period}",
        pending.len(),
        caller.user_id()
    );
    Ok(pending)
}
