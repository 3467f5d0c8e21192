//! Ledger Errors

use lib_types::Amount;
use thiserror::Error;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error during ledger operations
///
/// Ordinary precondition failures surface to the host as a boolean `false`
/// return; arithmetic faults and storage faults abort the invocation instead
/// (see [`LedgerError::is_fatal`]).
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Invalid amount: {0}")]
    InvalidAmount(i128),

    #[error("Unauthorized: no witness for the acting address")]
    Unauthorized,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Malformed call: {0}")]
    MalformedCall(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Whether this failure aborts the whole invocation rather than folding
    /// into a `false` return.
    ///
    /// Silently wrapping arithmetic would be directly exploitable, so
    /// overflow and underflow are never reported as an ordinary refusal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Overflow | LedgerError::Underflow | LedgerError::Storage(_)
        )
    }
}
