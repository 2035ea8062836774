//! Category business logic - categories and the keyword rules that assign them.
//!
//! Every write to the rule set ends with [`CategoryRuleCache::invalidate`], so the
//! next transaction created without a category sees the new rules.

use crate::{
    cache::CategoryRuleCache,
    core::caller::Caller,
    entities::{
        Category, CategoryRule, Installment, RecurringExpense, Transaction, category,
        category_rule, installment, recurring_expense, transaction,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Fails with `NotFound` unless `category_id` belongs to the caller.
pub async fn ensure_category_owned<C>(
    db: &C,
    caller: &Caller,
    category_id: i64,
) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .filter(category::Column::UserId.eq(caller.user_id()))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Category",
            id: category_id,
        })
}

/// Creates a category. Names are trimmed and must be unique per account
/// (case-insensitive).
pub async fn create_category(
    db: &DatabaseConnection,
    caller: &Caller,
    name: &str,
    color: Option<String>,
) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("category name cannot be empty"));
    }

    let taken = list_categories(db, caller)
        .await?
        .iter()
        .any(|existing| existing.name.to_lowercase() == name.to_lowercase());
    if taken {
        return Err(Error::validation(format!("category '{name}' already exists")));
    }

    let model = category::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        name: Set(name.to_string()),
        color: Set(color),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!("Created category {} '{}' for {}", created.id, created.name, caller.user_id());
    Ok(created)
}

/// Lists the caller's categories alphabetically.
pub async fn list_categories<C>(db: &C, caller: &Caller) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(category::Column::UserId.eq(caller.user_id()))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a category, clearing it from transactions, recurring expenses and
/// installments and removing its rules, all in one database transaction.
pub async fn delete_category(
    db: &DatabaseConnection,
    rules: &CategoryRuleCache,
    caller: &Caller,
    category_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let category = ensure_category_owned(&txn, caller, category_id).await?;

    Transaction::update_many()
        .col_expr(transaction::Column::CategoryId, Expr::value(Option::<i64>::None))
        .filter(transaction::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    RecurringExpense::update_many()
        .col_expr(
            recurring_expense::Column::CategoryId,
            Expr::value(Option::<i64>::None),
        )
        .filter(recurring_expense::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    Installment::update_many()
        .col_expr(installment::Column::CategoryId, Expr::value(Option::<i64>::None))
        .filter(installment::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    CategoryRule::delete_many()
        .filter(category_rule::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;
    category.delete(&txn).await?;

    txn.commit().await?;
    rules.invalidate();

    info!("Deleted category {category_id} for {}", caller.user_id());
    Ok(())
}

/// Creates a keyword rule pointing at one of the caller's categories.
pub async fn create_rule(
    db: &DatabaseConnection,
    rules: &CategoryRuleCache,
    caller: &Caller,
    keyword: &str,
    category_id: i64,
) -> Result<category_rule::Model> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(Error::validation("rule keyword cannot be empty"));
    }
    ensure_category_owned(db, caller, category_id).await?;

    let model = category_rule::ActiveModel {
        user_id: Set(caller.user_id().to_string()),
        keyword: Set(keyword.to_string()),
        category_id: Set(category_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    rules.invalidate();

    info!(
        "Created category rule {} ('{}' -> {}) for {}",
        created.id,
        created.keyword,
        category_id,
        caller.user_id()
    );
    Ok(created)
}

/// Lists the caller's rules, oldest first.
pub async fn list_rules(db: &DatabaseConnection, caller: &Caller) -> Result<Vec<category_rule::Model>> {
    CategoryRule::find()
        .filter(category_rule::Column::UserId.eq(caller.user_id()))
        .order_by_asc(category_rule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes one of the caller's rules.
pub async fn delete_rule(
    db: &DatabaseConnection,
    rules: &CategoryRuleCache,
    caller: &Caller,
    rule_id: i64,
) -> Result<()> {
    let rule = CategoryRule::find_by_id(rule_id)
        .filter(category_rule::Column::UserId.eq(caller.user_id()))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "CategoryRule",
            id: rule_id,
        })?;

    rule.delete(db).await?;
    rules.invalidate();

    info!("Deleted category rule {rule_id} for {}", caller.user_id());
    Ok(())
}
