//! Recurring expense entity - Template for a transaction that repeats every month.
//!
//! Templates weakly own the transactions generated from them through
//! `transactions.recurring_expense_id`. Switching `is_active` off stops generation
//! without touching history.

use super::transaction::TransactionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recurring expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_expenses")]
pub struct Model {
    /// Unique identifier for the template
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns the template
    pub user_id: String,
    /// Description copied onto every generated transaction
    pub description: String,
    /// Unsigned amount used when no override is given (always > 0)
    pub default_amount: f64,
    /// Preferred day of month, 1..=31
    pub day_of_month: i32,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Origin copied onto generated transactions
    pub origin: String,
    /// Optional category copied onto generated transactions
    pub category_id: Option<i64>,
    /// Inactive templates are never generated nor listed as pending
    pub is_active: bool,
    /// Whether the template may be materialized on demand / by the sweep
    pub auto_generate: bool,
    /// When the template was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `RecurringExpense` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One template has many generated transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// Each template may belong to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
