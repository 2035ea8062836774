//! Unified error type for the finance tracker.
//!
//! Core operations return [`Result`]; the HTTP layer maps each variant to a
//! status code and a localized message (see `api::error`).

use crate::entities::transaction;
use thiserror::Error;

/// Every failure a core operation or the binary can report.
#[derive(Debug, Error)]
pub enum Error {
    /// No resolved caller identity was supplied.
    #[error("Unauthorized")]
    Unauthorized,

    /// The entity does not exist or belongs to another account.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: i64,
    },

    /// A transaction was already generated from the template for that month.
    #[error("Recurring expense {recurring_expense_id} already has a transaction in {period}")]
    Conflict {
        /// Template the generation was requested for
        recurring_expense_id: i64,
        /// Month window, formatted `YYYY-MM`
        period: String,
        /// The transaction that already occupies the month
        existing: Box<transaction::Model>,
    },

    /// The template's generation policy forbids the requested operation.
    #[error("{message}")]
    PolicyViolation {
        /// What was refused
        message: String,
        /// How the user can change the setting if they really want this
        hint: String,
    },

    /// The transaction is part of an installment and cannot become recurring.
    #[error("Transaction {transaction_id} belongs to an installment")]
    IncompatibleKind {
        /// Offending transaction
        transaction_id: i64,
    },

    /// The transaction is already linked to a recurring expense.
    #[error("Transaction {transaction_id} is already linked to recurring expense {recurring_expense_id}")]
    AlreadyLinked {
        /// Offending transaction
        transaction_id: i64,
        /// Template it is linked to
        recurring_expense_id: i64,
    },

    /// Installment children can only be removed together with the installment.
    #[error("Transaction {transaction_id} is part of installment {installment_id}")]
    InstallmentMember {
        /// Offending transaction
        transaction_id: i64,
        /// Installment that owns it
        installment_id: i64,
    },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
