//! Core business logic - framework-agnostic operations on an account's finances.
//!
//! Every function takes the [`caller::Caller`] whose data it reads or writes and
//! never touches another account's rows.

/// Authenticated account identity
pub mod caller;
/// Categories and keyword rules
pub mod category;
/// CSV export
pub mod export;
/// Installment purchases and their parts
pub mod installment;
/// Monthly auto-generation sweep
pub mod monthly;
/// Calendar month windows
pub mod period;
/// Turning a transaction into a recurring expense
pub mod promote;
/// Recurring expense templates and their monthly transactions
pub mod recurring;
/// Monthly and yearly summaries
pub mod report;
/// Per-account key-value settings
pub mod settings;
/// Transaction CRUD
pub mod transaction;
