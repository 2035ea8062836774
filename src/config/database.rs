//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the database schema always matches the
//! Rust structs. The composite unique constraints the entities cannot express,
//! `(recurring_expense_id, recurrence_month)` on transactions and
//! `(user_id, key)` on settings, are created here as indexes.

use crate::entities::{
    Category, CategoryRule, Installment, RecurringExpense, Setting, Transaction, setting,
    transaction,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

/// Name of the unique index that prevents two generated transactions for the
/// same recurring expense and month.
pub const RECURRENCE_MONTH_INDEX: &str = "idx_transactions_recurrence_month";

/// Name of the unique index that keeps one value per account and setting key.
pub const SETTING_KEY_INDEX: &str = "idx_settings_user_key";

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    statement
}

fn recurrence_month_index() -> IndexCreateStatement {
    Index::create()
        .name(RECURRENCE_MONTH_INDEX)
        .table(Transaction)
        .col(transaction::Column::RecurringExpenseId)
        .col(transaction::Column::RecurrenceMonth)
        .unique()
        .if_not_exists()
        .to_owned()
}

fn setting_key_index() -> IndexCreateStatement {
    Index::create()
        .name(SETTING_KEY_INDEX)
        .table(Setting)
        .col(setting::Column::UserId)
        .col(setting::Column::Key)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates all tables and indexes. Safe to call on an existing database.
///
/// Parent tables are created before `transactions` so the foreign keys
/// generated from the `belongs_to` relations resolve.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        table_for(&schema, Category),
        table_for(&schema, CategoryRule),
        table_for(&schema, RecurringExpense),
        table_for(&schema, Installment),
        table_for(&schema, Transaction),
        table_for(&schema, Setting),
    ];
    for table in &tables {
        db.execute(builder.build(table)).await?;
    }

    db.execute(builder.build(&recurrence_month_index())).await?;
    db.execute(builder.build(&setting_key_index())).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{
        CategoryModel, InstallmentModel, RecurringExpenseModel, SettingModel, TransactionModel,
    };
    use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, SqlErr};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<RecurringExpenseModel> = RecurringExpense::find().limit(1).all(&db).await?;
        let _: Vec<InstallmentModel> = Installment::find().limit(1).all(&db).await?;
        let _: Vec<CategoryModel> = Category::find().limit(1).all(&db).await?;
        let _: Vec<SettingModel> = Setting::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_settings_key_is_unique_per_account() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let row = |user_id: &str| setting::ActiveModel {
            user_id: Set(user_id.to_string()),
            key: Set("currency".to_string()),
            value: Set("BRL".to_string()),
            updated_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };
        row("alice").insert(&db).await?;
        row("bob").insert(&db).await?;

        let err = row("alice").insert(&db).await.unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
