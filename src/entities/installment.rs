//! Installment entity - A purchase split into N monthly transactions.
//!
//! The installment and its children form one unit: they are created together
//! and deleted together.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Installment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    /// Unique identifier for the installment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account that owns the installment
    pub user_id: String,
    /// What was bought
    pub description: String,
    /// Full purchase price (unsigned)
    pub total_amount: f64,
    /// Number of monthly parts
    pub total_installments: i32,
    /// Nominal amount of each part (unsigned, rounded to cents)
    pub installment_amount: f64,
    /// Date of the first part
    pub start_date: Date,
    /// Card or account the parts are charged to
    pub origin: String,
    /// Optional category shared by all parts
    pub category_id: Option<i64>,
    /// When the installment was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Installment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One installment has many child transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
