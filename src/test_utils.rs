//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    cache::CategoryRuleCache,
    core::{
        caller::Caller,
        category,
        installment::{self, InstallmentWithTransactions, NewInstallment},
        recurring::{self, NewRecurringExpense},
        transaction::{self as transactions, NewTransaction},
    },
    entities::{Transaction, TransactionType, category_rule, recurring_expense, transaction},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, Set, prelude::*};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds a caller for `user_id`.
#[allow(clippy::unwrap_used)]
pub fn test_caller(user_id: &str) -> Caller {
    Caller::from_session(Some(user_id)).unwrap()
}

/// Shorthand for a calendar date.
#[allow(clippy::unwrap_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Transaction input with sensible defaults.
///
/// # Defaults
/// * `transaction_type`: Expense
/// * `origin`: "Nubank"
/// * `category_id`: None
/// * `is_fixed`: false
pub fn new_transaction(description: &str, amount: f64, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        description: description.to_string(),
        amount,
        date,
        transaction_type: TransactionType::Expense,
        origin: "Nubank".to_string(),
        category_id: None,
        is_fixed: false,
    }
}

/// Creates a one-off transaction; negative amounts are expenses, others income.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    caller: &Caller,
    amount: f64,
    date: NaiveDate,
) -> Result<transaction::Model> {
    let mut input = new_transaction("Test transaction", amount, date);
    if amount > 0.0 {
        input.transaction_type = TransactionType::Income;
    }
    transactions::create_transaction(db, &CategoryRuleCache::new(), caller, input).await
}

/// Creates a category without a color.
pub async fn create_test_category(
    db: &DatabaseConnection,
    caller: &Caller,
    name: &str,
) -> Result<crate::entities::CategoryModel> {
    category::create_category(db, caller, name, None).await
}

/// Inserts a rule straight into the store, bypassing cache invalidation.
pub async fn insert_rule_without_invalidating(
    db: &DatabaseConnection,
    caller: &Caller,
    keyword: &str,
    category_id: i64,
) -> Result<category_rule::Model> {
    let rule = category_rule::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        keyword: Set(keyword.to_string()),
        category_id: Set(category_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(rule.insert(db).await?)
}

/// Recurring expense input with sensible defaults.
///
/// # Defaults
/// * `transaction_type`: Expense
/// * `origin`: "Nubank"
/// * `category_id`: None
pub fn new_recurring(
    description: &str,
    default_amount: f64,
    day_of_month: i32,
    auto_generate: bool,
) -> NewRecurringExpense {
    NewRecurringExpense {
        description: description.to_string(),
        default_amount,
        day_of_month,
        transaction_type: TransactionType::Expense,
        origin: "Nubank".to_string(),
        category_id: None,
        auto_generate,
    }
}

/// Creates a recurring expense template.
pub async fn create_test_recurring(
    db: &DatabaseConnection,
    caller: &Caller,
    description: &str,
    default_amount: f64,
    day_of_month: i32,
    auto_generate: bool,
) -> Result<recurring_expense::Model> {
    recurring::create_recurring_expense(
        db,
        caller,
        new_recurring(description, default_amount, day_of_month, auto_generate),
    )
    .await
}

/// Counts transactions linked to a template.
pub async fn count_linked(db: &DatabaseConnection, recurring_expense_id: i64) -> Result<u64> {
    Ok(Transaction::find()
        .filter(transaction::Column::RecurringExpenseId.eq(recurring_expense_id))
        .count(db)
        .await?)
}

/// Links an existing transaction to a template the way a statement import would,
/// leaving its fixed flag untouched.
pub async fn link_to_template(
    db: &DatabaseConnection,
    transaction_id: i64,
    recurring_expense_id: i64,
    recurrence_month: &str,
) -> Result<transaction::Model> {
    let existing = Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or(crate::errors::Error::NotFound {
            entity: "Transaction",
            id: transaction_id,
        })?;
    let mut active_model: transaction::ActiveModel = existing.into();
    active_model.recurring_expense_id = Set(Some(recurring_expense_id));
    active_model.recurrence_month = Set(Some(recurrence_month.to_string()));
    Ok(active_model.update(db).await?)
}

/// Creates an installment of `total_installments` parts starting 2024-01-15.
pub async fn create_test_installment(
    db: &DatabaseConnection,
    caller: &Caller,
    total_amount: f64,
    total_installments: i32,
) -> Result<InstallmentWithTransactions> {
    installment::create_installment(
        db,
        caller,
        NewInstallment {
            description: "Test purchase".to_string(),
            total_amount,
            total_installments,
            start_date: date(2024, 1, 15),
            origin: "Cartão".to_string(),
            category_id: None,
        },
    )
    .await
}
