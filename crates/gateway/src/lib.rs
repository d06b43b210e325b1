//! Typed access to a sale-pool contract on one ledger
//!
//! [`EvmGateway`] talks to the Solidity contract over Ethereum JSON-RPC,
//! [`ProgramGateway`] to the Anchor program over Solana JSON-RPC. Writes are
//! signed and broadcast by the wallet behind a [`SessionSigner`] and resolve
//! only once the ledger reports inclusion.

pub mod abi;
pub mod anchor;
pub mod confirm;
pub mod error;
pub mod evm;
pub mod mock;
pub mod rpc;
pub mod solana;

pub use confirm::{ConfirmationPolicy, ExponentialBackoff};
pub use error::ChainError;
pub use evm::{EvmGateway, EvmGatewayConfig, EvmRpc, HttpEvmRpc, TxReceipt};
pub use mock::MockLedger;
pub use solana::{
    Commitment, HttpProgramRpc, ProgramAccount, ProgramGateway, ProgramGatewayConfig, ProgramRpc,
    SignatureStatus,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use launchpad_session::SessionSigner;
use launchpad_types::{
    Address, Amount, AmountError, DraftField, ErrorKind, LedgerKind, PoolParams, PoolRecord,
    ProgramAddress, TransactionAttempt, TxKind,
};

/// Pool a write is aimed at
///
/// On Solana the id is only a position in the current listing; `account`
/// pins the write to the account the pool was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRef {
    pub id: u64,
    pub account: Option<ProgramAddress>,
}

impl PoolRef {
    /// Reference by id alone, enough for ledgers with a pool counter
    pub fn id(id: u64) -> Self {
        Self { id, account: None }
    }
}

impl From<&PoolRecord> for PoolRef {
    fn from(record: &PoolRecord) -> Self {
        Self {
            id: record.id,
            account: record.account,
        }
    }
}

/// Write operations of the sale contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolOperation {
    /// Allow the sale contract to move `amount` of `asset` from the signer
    Approve { asset: Address, amount: Amount },
    CreatePool(PoolParams),
    Contribute { pool: PoolRef, amount: Amount },
    Finalize { pool: PoolRef },
    Claim { pool: PoolRef },
}

impl PoolOperation {
    pub fn kind(&self) -> TxKind {
        match self {
            PoolOperation::Approve { .. } => TxKind::Approve,
            PoolOperation::CreatePool(_) => TxKind::CreatePool,
            PoolOperation::Contribute { .. } => TxKind::Contribute,
            PoolOperation::Finalize { .. } => TxKind::Finalize,
            PoolOperation::Claim { .. } => TxKind::Claim,
        }
    }
}

/// Sale-pool contract on one ledger
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    fn ledger(&self) -> LedgerKind;

    /// Whether pool creation needs a prior allowance grant
    fn requires_allowance(&self) -> bool;

    /// Check that `amount` for draft `field` fits this ledger's encoding
    fn check_amount(&self, field: DraftField, amount: &Amount) -> Result<(), AmountError>;

    async fn read_pool_count(&self) -> Result<u64, ErrorKind>;

    async fn read_pool(&self, id: u64) -> Result<PoolRecord, ErrorKind>;

    /// Sign, broadcast and wait for inclusion
    async fn submit(&self, operation: PoolOperation, signer: &SessionSigner) -> TransactionAttempt;

    /// Dry-run `operation` without broadcasting
    async fn simulate(
        &self,
        _operation: &PoolOperation,
        _signer: &SessionSigner,
    ) -> Result<(), ErrorKind> {
        Ok(())
    }
}
