use launchpad_types::{classify, ErrorKind, RawFailure};

/// Chain error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Error object returned by a JSON-RPC endpoint
    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("pool {0} not found")]
    PoolNotFound(u64),

    #[error("pool {0} is not bound to a program account")]
    UnboundPool(u64),

    #[error("transaction {0} reverted")]
    Reverted(String),

    #[error("timeout: {0}")]
    Timeout(String),
}

impl ChainError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::ConnectionFailed(_))
    }

    pub fn to_raw(&self) -> RawFailure {
        match self {
            ChainError::Rpc { code, message } => RawFailure::with_code(*code, message.clone()),
            other => RawFailure::new(other.to_string()),
        }
    }
}

impl From<ChainError> for ErrorKind {
    fn from(err: ChainError) -> Self {
        classify(&err.to_raw())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::ConnectionFailed(err.to_string())
    }
}
