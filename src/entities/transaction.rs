//! Transaction entity - Represents every income or expense recorded for an account.
//!
//! A transaction may be a plain one-off entry, a month of a recurring expense
//! (`recurring_expense_id` + `recurrence_month`), or one part of an installment
//! purchase (`installment_id` + `current_installment`). The last two are mutually
//! exclusive.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of money movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money coming in, stored with a positive amount
    #[sea_orm(string_value = "INCOME")]
    Income,
    /// Money going out, stored with a negative amount
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
}

impl TransactionType {
    /// Applies the sign convention: expenses negative, income positive.
    #[must_use]
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Self::Income => amount.abs(),
            Self::Expense => -amount.abs(),
        }
    }
}

/// Why a transaction counts as a fixed (monthly) entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixedKind {
    /// Not fixed
    #[sea_orm(string_value = "NONE")]
    None,
    /// Fixed because it is linked to a recurring expense
    #[sea_orm(string_value = "RECURRING")]
    Recurring,
    /// Marked fixed by the user
    #[sea_orm(string_value = "MANUAL")]
    Manual,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns the transaction
    pub user_id: String,
    /// Human-readable description of the transaction
    pub description: String,
    /// Signed amount (negative for expenses, positive for income)
    pub amount: f64,
    /// Day the money moved
    pub date: Date,
    /// Income or expense
    pub transaction_type: TransactionType,
    /// Where the money came from or went to (bank, card, wallet)
    pub origin: String,
    /// Optional category
    pub category_id: Option<i64>,
    /// Fixed-entry provenance; see [`Model::is_fixed`]
    pub fixed_kind: FixedKind,
    /// Whether this is one part of an installment purchase
    pub is_installment: bool,
    /// Owning installment, if any
    pub installment_id: Option<i64>,
    /// Position within the installment (1-based)
    pub current_installment: Option<i32>,
    /// Recurring expense this transaction was generated from or promoted into
    pub recurring_expense_id: Option<i64>,
    /// `YYYY-MM` month this transaction covers for its recurring expense
    pub recurrence_month: Option<String>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether the transaction is a fixed monthly entry, recurring or manual.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed_kind != FixedKind::None
    }

    /// Whether the transaction is part of an installment purchase.
    #[must_use]
    pub const fn belongs_to_installment(&self) -> bool {
        self.is_installment || self.installment_id.is_some()
    }
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction may belong to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// Each transaction may be generated from one recurring expense
    #[sea_orm(
        belongs_to = "super::recurring_expense::Entity",
        from = "Column::RecurringExpenseId",
        to = "super::recurring_expense::Column::Id"
    )]
    RecurringExpense,
    /// Each transaction may be one part of an installment
    #[sea_orm(
        belongs_to = "super::installment::Entity",
        from = "Column::InstallmentId",
        to = "super::installment::Column::Id"
    )]
    Installment,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::recurring_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringExpense.def()
    }
}

impl Related<super::installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
