//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod category_rule;
pub mod installment;
pub mod recurring_expense;
pub mod setting;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use category_rule::{
    Column as CategoryRuleColumn, Entity as CategoryRule, Model as CategoryRuleModel,
};
pub use installment::{
    Column as InstallmentColumn, Entity as Installment, Model as InstallmentModel,
};
pub use recurring_expense::{
    Column as RecurringExpenseColumn, Entity as RecurringExpense, Model as RecurringExpenseModel,
};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, FixedKind, Model as TransactionModel,
    TransactionType,
};
