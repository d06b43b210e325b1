use async_trait::async_trait;
use cosmwasm_std::Uint256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use launchpad_types::{
    Address, ChainId, EvmAddress, NetworkDescriptor, ProgramAddress, RawFailure, TxHandle,
};

/// Externally triggered wallet changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletNotification {
    /// New authorized account set, first entry is the active account
    AccountsChanged(Vec<String>),
    NetworkChanged(ChainId),
}

/// EVM transaction handed to the wallet for signing and broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTransaction {
    pub to: EvmAddress,
    pub data: Vec<u8>,
    /// Native value in wei
    pub value: Uint256,
}

/// Reference to an account in a program instruction
///
/// Keys the client cannot know up front (program-derived addresses, associated
/// token accounts, fresh keypairs) are described and resolved by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKey {
    Known(ProgramAddress),
    /// The signing wallet account
    Authority,
    /// Program-derived address of the instruction's program
    Derived(Vec<Seed>),
    /// Associated token account of `owner` for `mint`
    AssociatedToken {
        owner: Box<AccountKey>,
        mint: ProgramAddress,
    },
    /// Freshly generated keypair that co-signs the transaction
    NewKeypair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seed {
    Bytes(Vec<u8>),
    Key(AccountKey),
}

impl Seed {
    pub fn literal(bytes: &[u8]) -> Self {
        Seed::Bytes(bytes.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub name: String,
    pub key: AccountKey,
    pub writable: bool,
    pub signer: bool,
}

impl AccountMeta {
    pub fn readonly(name: &str, key: AccountKey) -> Self {
        Self {
            name: name.to_string(),
            key,
            writable: false,
            signer: false,
        }
    }

    pub fn writable(name: &str, key: AccountKey) -> Self {
        Self {
            name: name.to_string(),
            key,
            writable: true,
            signer: false,
        }
    }

    pub fn signer(mut self) -> Self {
        self.signer = true;
        self
    }
}

/// Byte of instruction data the wallet fills with the canonical bump of the
/// named derived account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BumpSlot {
    pub account: String,
    pub offset: usize,
}

/// Program instruction handed to the wallet for signing and broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInstruction {
    pub program_id: ProgramAddress,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
    pub bump_slot: Option<BumpSlot>,
}

impl ProgramInstruction {
    pub fn account(&self, name: &str) -> Option<&AccountMeta> {
        self.accounts.iter().find(|meta| meta.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignRequest {
    Evm(EvmTransaction),
    Program(ProgramInstruction),
}

/// Browser wallet as seen by the session manager
///
/// Failures come back raw; classification happens in the caller.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<String>, RawFailure>;

    async fn active_network(&self) -> Result<ChainId, RawFailure>;

    async fn switch_network(&self, chain_id: &ChainId) -> Result<(), RawFailure>;

    async fn register_network(&self, descriptor: &NetworkDescriptor) -> Result<(), RawFailure>;

    async fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletNotification>;

    async fn unsubscribe(&self);

    async fn sign_and_send(
        &self,
        account: &Address,
        request: SignRequest,
    ) -> Result<TxHandle, RawFailure>;
}

/// Signing authority: the connected account bound to its provider
#[derive(Clone)]
pub struct SessionSigner {
    account: Address,
    provider: Arc<dyn WalletProvider>,
}

impl SessionSigner {
    pub fn new(account: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self { account, provider }
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    pub async fn sign_and_send(&self, request: SignRequest) -> Result<TxHandle, RawFailure> {
        self.provider.sign_and_send(&self.account, request).await
    }
}

impl fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSigner")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}
