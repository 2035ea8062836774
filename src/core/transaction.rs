//! Transaction business logic - Handles all transaction-related operations.
//!
//! This module provides functions for creating, retrieving, updating and deleting
//! transactions for an account. Amounts are stored signed according to the
//! transaction type, and transactions created without a category are matched
//! against the account's category rules. Transactions that belong to a recurring
//! expense keep their `recurrence_month` in step with their date so the store's
//! unique index keeps guarding one generated transaction per month.

use crate::{
    cache::CategoryRuleCache,
    core::{caller::Caller, category, period::Period},
    entities::{FixedKind, Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Input for [`create_transaction`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub description: String,
    /// Amount in either sign; the stored sign follows `transaction_type`
    pub amount: f64,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub origin: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Marks the transaction as a manually fixed monthly entry
    #[serde(default)]
    pub is_fixed: bool,
}

/// Partial update for [`update_transaction`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub transaction_type: Option<TransactionType>,
    pub origin: Option<String>,
    /// `Some(None)` clears the category
    #[serde(default, with = "double_option")]
    pub category_id: Option<Option<i64>>,
    pub is_fixed: Option<bool>,
}

/// Filter for [`list_transactions`].
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub period: Option<Period>,
    pub category_id: Option<i64>,
    pub origin: Option<String>,
}

pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

pub(crate) fn validate_amount(amount: f64) -> Result<()> {
    if amount == 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

pub(crate) fn validate_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("description cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Creates a new transaction for the caller.
///
/// The amount is validated (non-zero, finite) and stored with the sign implied by
/// the transaction type. When no category is supplied, the category rules are
/// consulted through `rules`; an explicit category must belong to the caller.
pub async fn create_transaction(
    db: &DatabaseConnection,
    rules: &CategoryRuleCache,
    caller: &Caller,
    input: NewTransaction,
) -> Result<transaction::Model> {
    validate_amount(input.amount)?;
    let description = validate_description(&input.description)?;

    let category_id = match input.category_id {
        Some(id) => {
            category::ensure_category_owned(db, caller, id).await?;
            Some(id)
        }
        None => rules.lookup(db, caller, &description).await?,
    };

    let fixed_kind = if input.is_fixed {
        FixedKind::Manual
    } else {
        FixedKind::None
    };

    let model = transaction::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        description: Set(description),
        amount: Set(input.transaction_type.signed(input.amount)),
        date: Set(input.date),
        transaction_type: Set(input.transaction_type),
        origin: Set(input.origin.trim().to_string()),
        category_id: Set(category_id),
        fixed_kind: Set(fixed_kind),
        is_installment: Set(false),
        installment_id: Set(None),
        current_installment: Set(None),
        recurring_expense_id: Set(None),
        recurrence_month: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = model.insert(db).await?;
    info!(
        "Created transaction {} for {} ({:.2} on {})",
        result.id,
        caller.user_id(),
        result.amount,
        result.date
    );
    Ok(result)
}

/// Retrieves a transaction owned by the caller.
///
/// Returns `NotFound` both for missing rows and rows of other accounts.
pub async fn get_transaction<C>(
    db: &C,
    caller: &Caller,
    transaction_id: i64,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(caller.user_id()))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Transaction",
            id: transaction_id,
        })
}

/// Lists the caller's transactions, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    caller: &Caller,
    filter: &TransactionFilter,
) -> Result<Vec<transaction::Model>> {
    let mut query = Transaction::find().filter(transaction::Column::UserId.eq(caller.user_id()));

    if let Some(period) = filter.period {
        query = query.filter(
            transaction::Column::Date.between(period.first_day(), period.last_day()),
        );
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(transaction::Column::CategoryId.eq(category_id));
    }
    if let Some(origin) = &filter.origin {
        query = query.filter(transaction::Column::Origin.eq(origin.as_str()));
    }

    let transactions = query
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await?;
    debug!(
        "Listed {} transactions for {}",
        transactions.len(),
        caller.user_id()
    );
    Ok(transactions)
}

/// Finds the transaction generated from `recurring_expense_id` dated within
/// `period`, optionally ignoring one transaction.
pub(crate) async fn find_in_recurrence_month<C>(
    db: &C,
    caller: &Caller,
    recurring_expense_id: i64,
    period: Period,
    excluding: Option<i64>,
) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Transaction::find()
        .filter(transaction::Column::UserId.eq(caller.user_id()))
        .filter(transaction::Column::RecurringExpenseId.eq(recurring_expense_id))
        .filter(transaction::Column::Date.between(period.first_day(), period.last_day()));
    if let Some(id) = excluding {
        query = query.filter(transaction::Column::Id.ne(id));
    }
    query
        .order_by_asc(transaction::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to one of the caller's transactions.
///
/// A recurring-linked transaction cannot lose its fixed flag and cannot move
/// into a month that already has a transaction for the same recurring expense.
/// Installment parts keep the amount, type and date they were created with.
pub async fn update_transaction(
    db: &DatabaseConnection,
    caller: &Caller,
    transaction_id: i64,
    update: TransactionUpdate,
) -> Result<transaction::Model> {
    let txn = db.begin().await?;

    let existing = get_transaction(&txn, caller, transaction_id).await?;
    if existing.belongs_to_installment()
        && (update.amount.is_some() || update.transaction_type.is_some() || update.date.is_some())
    {
        let installment_id = existing.installment_id.unwrap_or_default();
        warn!("Refusing to change amount, type or date of installment part {transaction_id}");
        return Err(Error::InstallmentMember {
            transaction_id,
            installment_id,
        });
    }
    let mut active_model: transaction::ActiveModel = existing.clone().into();

    if let Some(description) = update.description {
        active_model.description = Set(validate_description(&description)?);
    }

    let transaction_type = update
        .transaction_type
        .unwrap_or(existing.transaction_type);
    let amount = update.amount.unwrap_or(existing.amount);
    validate_amount(amount)?;
    active_model.transaction_type = Set(transaction_type);
    active_model.amount = Set(transaction_type.signed(amount));

    if let Some(origin) = update.origin {
        active_model.origin = Set(origin.trim().to_string());
    }

    if let Some(category_id) = update.category_id {
        if let Some(id) = category_id {
            category::ensure_category_owned(&txn, caller, id).await?;
        }
        active_model.category_id = Set(category_id);
    }

    if let Some(is_fixed) = update.is_fixed {
        let linked = existing.recurring_expense_id.is_some();
        active_model.fixed_kind = Set(match (existing.fixed_kind, is_fixed) {
            (_, false) if linked => {
                return Err(Error::validation(
                    "transaction is linked to a recurring expense and stays fixed",
                ));
            }
            (FixedKind::Recurring, true) => FixedKind::Recurring,
            (_, true) => FixedKind::Manual,
            (_, false) => FixedKind::None,
        });
    }

    if let Some(date) = update.date {
        if let Some(recurring_expense_id) = existing.recurring_expense_id {
            let period = Period::of(date);
            if let Some(other) = find_in_recurrence_month(
                &txn,
                caller,
                recurring_expense_id,
                period,
                Some(transaction_id),
            )
            .await?
            {
                warn!(
                    "Refusing to move transaction {transaction_id} into {period}: transaction {} already covers it",
                    other.id
                );
                return Err(Error::Conflict {
                    recurring_expense_id,
                    period: period.key(),
                    existing: Box::new(other),
                });
            }
            active_model.recurrence_month = Set(Some(period.key()));
        }
        active_model.date = Set(date);
    }

    let updated = active_model.update(&txn).await?;
    txn.commit().await?;

    info!("Updated transaction {transaction_id} for {}", caller.user_id());
    Ok(updated)
}

/// Deletes one of the caller's transactions.
///
/// Installment parts are refused; the whole installment must be deleted instead.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    caller: &Caller,
    transaction_id: i64,
) -> Result<()> {
    let transaction = get_transaction(db, caller, transaction_id).await?;

    if transaction.belongs_to_installment() {
        let installment_id = transaction.installment_id.unwrap_or_default();
        warn!("Refusing to delete installment part {transaction_id} on its own");
        return Err(Error::InstallmentMember {
            transaction_id,
            installment_id,
        });
    }

    transaction.delete(db).await?;
    info!("Deleted transaction {transaction_id} for {}", caller.user_id());
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_transaction_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let rules = CategoryRuleCache::new();

        for amount in [0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = create_transaction(
                &db,
                &rules,
                &caller,
                new_transaction("Mercado", amount, date(2024, 1, 10)),
            )
            .await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }

        let result = create_transaction(
            &db,
            &rules,
            &caller,
            new_transaction("   ", 10.0, date(2024, 1, 10)),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_signs_amount_by_type() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let rules = CategoryRuleCache::new();

        let expense = create_transaction(
            &db,
            &rules,
            &caller,
            new_transaction("Aluguel", 1500.0, date(2024, 1, 5)),
        )
        .await?;
        assert_eq!(expense.amount, -1500.0);
        assert!(!expense.is_fixed());

        let mut salary = new_transaction("Salário", -5000.0, date(2024, 1, 5));
        salary.transaction_type = TransactionType::Income;
        salary.is_fixed = true;
        let income = create_transaction(&db, &rules, &caller, salary).await?;
        assert_eq!(income.amount, 5000.0);
        assert_eq!(income.fixed_kind, FixedKind::Manual);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_applies_category_rule() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let rules = CategoryRuleCache::new();
        let category = create_test_category(&db, &caller, "Transporte").await?;
        crate::core::category::create_rule(&db, &rules, &caller, "uber", category.id).await?;

        let transaction = create_transaction(
            &db,
            &rules,
            &caller,
            new_transaction("UBER *TRIP SAO PAULO", 23.9, date(2024, 2, 1)),
        )
        .await?;
        assert_eq!(transaction.category_id, Some(category.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_rejects_foreign_category() -> Result<()> {
        let db = setup_test_db().await?;
        let rules = CategoryRuleCache::new();
        let bob_category = create_test_category(&db, &test_caller("bob"), "Lazer").await?;

        let mut input = new_transaction("Cinema", 40.0, date(2024, 2, 1));
        input.category_id = Some(bob_category.id);
        let result = create_transaction(&db, &rules, &test_caller("alice"), input).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_transaction_hides_other_accounts() -> Result<()> {
        let db = setup_test_db().await?;
        let transaction =
            create_test_transaction(&db, &test_caller("alice"), -10.0, date(2024, 1, 1)).await?;

        let result = get_transaction(&db, &test_caller("bob"), transaction.id).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "Transaction",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_transactions_filters_by_period() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        create_test_transaction(&db, &caller, -10.0, date(2024, 1, 31)).await?;
        let feb_first = create_test_transaction(&db, &caller, -20.0, date(2024, 2, 1)).await?;
        let feb_last = create_test_transaction(&db, &caller, -30.0, date(2024, 2, 29)).await?;
        create_test_transaction(&db, &caller, -40.0, date(2024, 3, 1)).await?;
        create_test_transaction(&db, &test_caller("bob"), -50.0, date(2024, 2, 10)).await?;

        let filter = TransactionFilter {
            period: Some(Period::new(2, 2024)?),
            ..TransactionFilter::default()
        };
        let transactions = list_transactions(&db, &caller, &filter).await?;
        let ids: Vec<i64> = transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![feb_last.id, feb_first.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_transaction_partial_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let transaction = create_test_transaction(&db, &caller, -10.0, date(2024, 1, 1)).await?;

        let updated = update_transaction(
            &db,
            &caller,
            transaction.id,
            TransactionUpdate {
                amount: Some(25.0),
                is_fixed: Some(true),
                ..TransactionUpdate::default()
            },
        )
        .await?;
        assert_eq!(updated.amount, -25.0);
        assert_eq!(updated.fixed_kind, FixedKind::Manual);
        assert_eq!(updated.description, transaction.description);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_transaction_cannot_unfix_recurring() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let template = create_test_recurring(&db, &caller, "Internet", 100.0, 10, true).await?;
        let generated =
            crate::core::recurring::generate(&db, &caller, template.id, 3, 2024, None).await?;

        let result = update_transaction(
            &db,
            &caller,
            generated.id,
            TransactionUpdate {
                is_fixed: Some(false),
                ..TransactionUpdate::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_transaction_date_into_occupied_month_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let template = create_test_recurring(&db, &caller, "Internet", 100.0, 10, true).await?;
        let march =
            crate::core::recurring::generate(&db, &caller, template.id, 3, 2024, None).await?;
        let april =
            crate::core::recurring::generate(&db, &caller, template.id, 4, 2024, None).await?;

        let result = update_transaction(
            &db,
            &caller,
            april.id,
            TransactionUpdate {
                date: Some(date(2024, 3, 20)),
                ..TransactionUpdate::default()
            },
        )
        .await;
        match result {
            Err(Error::Conflict { existing, .. }) => assert_eq!(existing.id, march.id),
            other => panic!("expected conflict, got {other:?}"),
        }

        // Moving within the same month keeps the recurrence month
        let moved = update_transaction(
            &db,
            &caller,
            april.id,
            TransactionUpdate {
                date: Some(date(2024, 4, 25)),
                ..TransactionUpdate::default()
            },
        )
        .await?;
        assert_eq!(moved.recurrence_month.as_deref(), Some("2024-04"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_transaction() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let transaction = create_test_transaction(&db, &caller, -10.0, date(2024, 1, 1)).await?;

        let result = delete_transaction(&db, &test_caller("bob"), transaction.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        delete_transaction(&db, &caller, transaction.id).await?;
        assert!(Transaction::find_by_id(transaction.id).one(&db).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_installment_part_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let created = create_test_installment(&db, &caller, 300.0, 3).await?;
        let part = &created.transactions[1];

        let result = delete_transaction(&db, &caller, part.id).await;
        assert!(matches!(
            result,
            Err(Error::InstallmentMember { installment_id, .. }) if installment_id == created.installment.id
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_installment_part_keeps_amount_type_and_date() -> Result<()> {
        let db = setup_test_db().await?;
        let caller = test_caller("alice");
        let created = create_test_installment(&db, &caller, 300.0, 3).await?;
        let part = &created.transactions[1];

        for update in [
            TransactionUpdate {
                amount: Some(50.0),
                ..TransactionUpdate::default()
            },
            TransactionUpdate {
                transaction_type: Some(TransactionType::Income),
                ..TransactionUpdate::default()
            },
            TransactionUpdate {
                date: Some(date(2024, 3, 1)),
                ..TransactionUpdate::default()
            },
        ] {
            let result = update_transaction(&db, &caller, part.id, update).await;
            assert!(matches!(result, Err(Error::InstallmentMember { .. })));
        }
        let unchanged = get_transaction(&db, &caller, part.id).await?;
        assert_eq!(unchanged.amount, part.amount);
        assert_eq!(unchanged.date, part.date);

        // Descriptive fields can still be edited
        let renamed = update_transaction(
            &db,
            &caller,
            part.id,
            TransactionUpdate {
                origin: Some("Visa".to_string()),
                ..TransactionUpdate::default()
            },
        )
        .await?;
        assert_eq!(renamed.origin, "Visa");
        assert_eq!(renamed.amount, part.amount);
        Ok(())
    }
}
