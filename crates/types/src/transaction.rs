use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ErrorKind;

/// Write operation kinds against a sale-pool ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Approve,
    CreatePool,
    Contribute,
    Finalize,
    Claim,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Approve => "approve",
            TxKind::CreatePool => "create_pool",
            TxKind::Contribute => "contribute",
            TxKind::Finalize => "finalize",
            TxKind::Claim => "claim",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger-side handle of a broadcast transaction (tx hash or signature)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHandle(pub String);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Pending,
    Confirmed,
    Failed(ErrorKind),
}

/// One submitted write operation
///
/// Terminal once confirmed or failed; the transition methods consume the
/// attempt and leave a terminal attempt untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAttempt {
    pub kind: TxKind,
    pub state: TxState,
    pub handle: Option<TxHandle>,
}

impl TransactionAttempt {
    pub fn pending(kind: TxKind) -> Self {
        Self {
            kind,
            state: TxState::Pending,
            handle: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, TxState::Pending)
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, TxState::Confirmed)
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        match &self.state {
            TxState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Record the broadcast handle while still pending
    pub fn broadcast(mut self, handle: TxHandle) -> Self {
        if !self.is_terminal() {
            self.handle = Some(handle);
        }
        self
    }

    pub fn confirm(mut self) -> Self {
        if !self.is_terminal() {
            self.state = TxState::Confirmed;
        }
        self
    }

    pub fn fail(mut self, error: ErrorKind) -> Self {
        if !self.is_terminal() {
            self.state = TxState::Failed(error);
        }
        self
    }

    /// `Ok` for a confirmed attempt, the classified error otherwise
    pub fn into_result(self) -> Result<TransactionAttempt, ErrorKind> {
        match self.state {
            TxState::Failed(err) => Err(err),
            TxState::Pending => Err(ErrorKind::LedgerRejected(format!(
                "{} transaction was not confirmed",
                self.kind
            ))),
            TxState::Confirmed => Ok(self),
        }
    }
}
