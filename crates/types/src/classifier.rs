//! Maps raw wallet and ledger failures onto [`ErrorKind`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ErrorKind;

/// EIP-1193 "user rejected request"
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-3085 "unrecognized chain id", returned by a network switch
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Failure as reported by a wallet provider or an RPC endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFailure {
    pub code: Option<i64>,
    pub message: String,
}

impl RawFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Some(UNRECOGNIZED_CHAIN_CODE)
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

const REJECTION_MARKERS: &[&str] = &[
    "user rejected",
    "user denied",
    "rejected the request",
    "action_rejected",
];

const FUNDS_MARKERS: &[&str] = &[
    "insufficient funds",
    "exceeds balance",
    "insufficient lamports",
    "insufficient balance",
];

const PROVIDER_MARKERS: &[&str] = &["wallet not found", "no wallet provider", "provider missing"];

/// Classify a transaction or query failure
///
/// Unrecognized failures become [`ErrorKind::LedgerRejected`] with the raw
/// message kept verbatim.
pub fn classify(failure: &RawFailure) -> ErrorKind {
    if failure.code == Some(USER_REJECTED_CODE) {
        return ErrorKind::UserRejected;
    }

    let message = failure.message.to_lowercase();
    if contains_any(&message, REJECTION_MARKERS) {
        ErrorKind::UserRejected
    } else if contains_any(&message, FUNDS_MARKERS) {
        ErrorKind::InsufficientFunds
    } else if message.contains("allowance") {
        ErrorKind::InsufficientAllowance
    } else if contains_any(&message, PROVIDER_MARKERS) {
        ErrorKind::ProviderMissing
    } else {
        ErrorKind::LedgerRejected(failure.message.clone())
    }
}

/// Classify a failure from a network switch or registration request
pub fn classify_network_failure(failure: &RawFailure) -> ErrorKind {
    match classify(failure) {
        ErrorKind::UserRejected => ErrorKind::UserRejected,
        _ => ErrorKind::NetworkSwitchFailed,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection_by_code_and_text() {
        assert_eq!(
            classify(&RawFailure::with_code(4001, "whatever")),
            ErrorKind::UserRejected
        );
        assert_eq!(
            classify(&RawFailure::new(
                "ethers-user-denied: MetaMask Tx Signature: User denied transaction signature."
            )),
            ErrorKind::UserRejected
        );
        assert_eq!(
            classify(&RawFailure::new("user rejected action (action=\"sendTransaction\")")),
            ErrorKind::UserRejected
        );
    }

    #[test]
    fn test_funds_and_allowance() {
        assert_eq!(
            classify(&RawFailure::with_code(
                -32000,
                "insufficient funds for gas * price + value"
            )),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            classify(&RawFailure::new("ERC20: transfer amount exceeds balance")),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            classify(&RawFailure::new("ERC20: insufficient allowance")),
            ErrorKind::InsufficientAllowance
        );
    }

    #[test]
    fn test_unknown_failure_keeps_raw_message() {
        let raw = "execution reverted: Pool has ended";
        assert_eq!(
            classify(&RawFailure::with_code(3, raw)),
            ErrorKind::LedgerRejected(raw.to_string())
        );
    }

    #[test]
    fn test_network_failure_classification() {
        assert_eq!(
            classify_network_failure(&RawFailure::with_code(4001, "User rejected the request.")),
            ErrorKind::UserRejected
        );
        assert_eq!(
            classify_network_failure(&RawFailure::with_code(-32603, "Internal error")),
            ErrorKind::NetworkSwitchFailed
        );
        assert!(RawFailure::with_code(4902, "Unrecognized chain ID").is_unrecognized_chain());
    }
}
