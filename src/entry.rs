//! Transaction entry validation
//!
//! Field checks applied before anything is sent to the service. The rules
//! are presence/positivity only; version ordering and netting are the
//! service's problem.

use thiserror::Error;

use crate::equities::{Action, Side, Transaction};

/// Whether the entry creates a new transaction or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    New,
    Edit,
}

/// A field check that blocks submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Transaction ID must be a positive number.")]
    TransactionId,
    #[error("Trade ID must be a positive number.")]
    TradeId,
    #[error("Version must be a positive number.")]
    Version,
    #[error("Security code is required.")]
    SecurityCode,
    #[error("Quantity must be a positive number.")]
    Quantity,
}

/// Blank entry with the form defaults
pub fn draft() -> Transaction {
    Transaction {
        transaction_id: None,
        trade_id: 0,
        version: 1,
        security_code: String::new(),
        quantity: 0,
        action: Action::Insert,
        side: Side::Buy,
        is_latest_version: None,
    }
}

/// Check a transaction entry, first failure wins
///
/// A transaction id is only demanded when editing; new entries leave it for
/// the service to assign.
pub fn validate(transaction: &Transaction, mode: EntryMode) -> Result<(), ValidationError> {
    if mode == EntryMode::Edit && transaction.transaction_id.unwrap_or(0) <= 0 {
        return Err(ValidationError::TransactionId);
    }

    if transaction.trade_id <= 0 {
        return Err(ValidationError::TradeId);
    }

    if transaction.version <= 0 {
        return Err(ValidationError::Version);
    }

    if transaction.security_code.trim().is_empty() {
        return Err(ValidationError::SecurityCode);
    }

    if transaction.quantity <= 0 {
        return Err(ValidationError::Quantity);
    }

    Ok(())
}
