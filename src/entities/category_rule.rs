//! Category rule entity - Keyword that assigns a category to new transactions.
//!
//! When a transaction is created without a category, its description is matched
//! against the account's rules (see `cache::CategoryRuleCache`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category rule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    /// Text searched for (case-insensitively) in transaction descriptions
    pub keyword: String,
    /// Category assigned on match
    pub category_id: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
