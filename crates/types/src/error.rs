use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Amount, DraftField, LedgerKind, Timestamp};

/// Closed set of outcomes surfaced to the user for any failed interaction
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ErrorKind {
    #[error("request rejected in wallet")]
    UserRejected,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("insufficient token allowance")]
    InsufficientAllowance,

    #[error("no wallet provider installed")]
    ProviderMissing,

    #[error("could not switch wallet to the target network")]
    NetworkSwitchFailed,

    #[error("validation failed: {0}")]
    ValidationFailed(ValidationReason),

    #[error("ledger rejected: {0}")]
    LedgerRejected(String),
}

impl ErrorKind {
    pub fn validation(reason: ValidationReason) -> Self {
        ErrorKind::ValidationFailed(reason)
    }

    /// Short label used for metrics and log fields
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::InsufficientAllowance => "insufficient_allowance",
            ErrorKind::ProviderMissing => "provider_missing",
            ErrorKind::NetworkSwitchFailed => "network_switch_failed",
            ErrorKind::ValidationFailed(_) => "validation_failed",
            ErrorKind::LedgerRejected(_) => "ledger_rejected",
        }
    }
}

impl From<ValidationReason> for ErrorKind {
    fn from(reason: ValidationReason) -> Self {
        ErrorKind::ValidationFailed(reason)
    }
}

/// Locally detected reasons an operation is not submitted
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationReason {
    #[error("{value:?} is not a valid {ledger} address")]
    InvalidAssetAddress { value: String, ledger: LedgerKind },

    #[error("{field} is required")]
    MissingWindow { field: DraftField },

    #[error("{field}: cannot parse timestamp {value:?}")]
    InvalidTimestamp { field: DraftField, value: String },

    #[error("window start {start} must be before window end {end}")]
    WindowNotOrdered { start: Timestamp, end: Timestamp },

    #[error("{field} is required")]
    MissingAmount { field: DraftField },

    #[error("{field}: {reason}")]
    InvalidAmount { field: DraftField, reason: String },

    #[error("min contribution {min} exceeds max contribution {max}")]
    MinExceedsMax { min: Amount, max: Amount },

    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("pool {pool_id} is not in the registry")]
    UnknownPool { pool_id: u64 },

    #[error("pool {pool_id} is already finalized")]
    PoolFinalized { pool_id: u64 },

    #[error("pool {pool_id} is not finalized yet")]
    PoolNotFinalized { pool_id: u64 },

    #[error("pool {pool_id} accepts contributions between {start} and {end}, now is {now}")]
    OutsideWindow {
        pool_id: u64,
        start: Timestamp,
        end: Timestamp,
        now: Timestamp,
    },

    #[error("contribution: {reason}")]
    InvalidContribution { reason: String },

    #[error("contribution {amount} is below min contribution {min}")]
    BelowMinContribution { amount: Amount, min: Amount },

    #[error("contribution {amount} is above max contribution {max}")]
    AboveMaxContribution { amount: Amount, max: Amount },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_labels() {
        assert_eq!(ErrorKind::UserRejected.label(), "user_rejected");
        assert_eq!(
            ErrorKind::from(ValidationReason::WalletNotConnected).label(),
            "validation_failed"
        );
    }

    #[test]
    fn test_ledger_rejected_keeps_raw_message() {
        let err = ErrorKind::LedgerRejected("execution reverted: Pool ended".to_string());
        assert_eq!(err.to_string(), "ledger rejected: execution reverted: Pool ended");
    }

    #[test]
    fn test_validation_message() {
        let err = ErrorKind::validation(ValidationReason::MissingAmount {
            field: DraftField::UnitPrice,
        });
        assert_eq!(err.to_string(), "validation failed: unit_price is required");
    }
}
