use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use launchpad_session::{SessionSigner, SignRequest};
use launchpad_types::{
    base58_encode, classify, Amount, AmountError, DraftField, ErrorKind, LedgerKind, PoolRecord,
    ProgramAddress, TransactionAttempt, TxHandle, LAMPORT_DECIMALS,
};

use crate::anchor::{self, PoolAccount};
use crate::confirm::{wait_until, ConfirmationPolicy};
use crate::rpc::JsonRpcClient;
use crate::{ChainError, LedgerGateway, PoolOperation, PoolRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub confirmation_status: Option<Commitment>,
    /// Program error, if the transaction failed
    pub err: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAccount {
    pub pubkey: ProgramAddress,
    pub data: Vec<u8>,
}

/// Read-only Solana node access
#[async_trait]
pub trait ProgramRpc: Send + Sync {
    /// Accounts owned by `program_id` whose data starts with `discriminator`
    async fn program_accounts(
        &self,
        program_id: &ProgramAddress,
        discriminator: [u8; 8],
    ) -> Result<Vec<ProgramAccount>, ChainError>;

    async fn signature_status(
        &self,
        signature: &TxHandle,
    ) -> Result<Option<SignatureStatus>, ChainError>;
}

/// [`ProgramRpc`] over Solana JSON-RPC
pub struct HttpProgramRpc {
    client: JsonRpcClient,
    commitment: Commitment,
}

impl HttpProgramRpc {
    pub fn new(
        url: impl Into<String>,
        commitment: Commitment,
        timeout: Duration,
    ) -> Result<Self, ChainError> {
        Ok(Self {
            client: JsonRpcClient::new(url, timeout)?,
            commitment,
        })
    }
}

#[derive(Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: AccountInfo,
}

#[derive(Deserialize)]
struct AccountInfo {
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Deserialize)]
struct RpcStatuses {
    value: Vec<Option<RpcStatus>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcStatus {
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

#[async_trait]
impl ProgramRpc for HttpProgramRpc {
    async fn program_accounts(
        &self,
        program_id: &ProgramAddress,
        discriminator: [u8; 8],
    ) -> Result<Vec<ProgramAccount>, ChainError> {
        let accounts: Vec<KeyedAccount> = self
            .client
            .call(
                "getProgramAccounts",
                json!([
                    program_id.to_string(),
                    {
                        "encoding": "base64",
                        "commitment": self.commitment.as_str(),
                        "filters": [
                            { "memcmp": { "offset": 0, "bytes": base58_encode(&discriminator) } }
                        ]
                    }
                ]),
            )
            .await?;

        accounts
            .into_iter()
            .map(|keyed| {
                let pubkey = ProgramAddress::from_str(&keyed.pubkey)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
                let (payload, encoding) = keyed.account.data;
                if encoding != "base64" {
                    return Err(ChainError::InvalidResponse(format!(
                        "unexpected account encoding {encoding}"
                    )));
                }
                let data = BASE64
                    .decode(payload)
                    .map_err(|e| ChainError::InvalidResponse(format!("account {pubkey}: {e}")))?;
                Ok(ProgramAccount { pubkey, data })
            })
            .collect()
    }

    async fn signature_status(
        &self,
        signature: &TxHandle,
    ) -> Result<Option<SignatureStatus>, ChainError> {
        let statuses: RpcStatuses = self
            .client
            .call(
                "getSignatureStatuses",
                json!([[signature.0], { "searchTransactionHistory": true }]),
            )
            .await?;

        Ok(statuses
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                confirmation_status: status.confirmation_status,
                err: status.err.map(|err| err.to_string()),
            }))
    }
}

#[derive(Debug, Clone)]
pub struct ProgramGatewayConfig {
    pub program_id: ProgramAddress,
    /// Decimals of the sale token mint
    pub token_decimals: u32,
    pub commitment: Commitment,
    pub confirmation: ConfirmationPolicy,
}

type PoolListing = Arc<Vec<(ProgramAddress, PoolAccount)>>;

/// Anchor `launchpad` program on Solana
///
/// The program has no pool counter; pools are listed from the program's
/// accounts and numbered by `(start_time, pubkey)` order.
pub struct ProgramGateway {
    rpc: Arc<dyn ProgramRpc>,
    config: ProgramGatewayConfig,
    // Listing taken by the last `read_pool_count`, indexed by `read_pool`
    listing: Mutex<Option<PoolListing>>,
}

impl ProgramGateway {
    pub fn new(rpc: Arc<dyn ProgramRpc>, config: ProgramGatewayConfig) -> Self {
        Self {
            rpc,
            config,
            listing: Mutex::new(None),
        }
    }

    /// Current pool accounts in id order
    async fn fetch_pools(&self) -> Result<PoolListing, ChainError> {
        let accounts = self
            .rpc
            .program_accounts(&self.config.program_id, anchor::account_discriminator("Pool"))
            .await?;

        let mut pools = Vec::with_capacity(accounts.len());
        for account in accounts {
            match PoolAccount::decode(&account.data) {
                Ok(state) => pools.push((account.pubkey, state)),
                Err(e) => {
                    tracing::warn!(account = %account.pubkey, error = %e, "Skipping undecodable pool account");
                }
            }
        }
        pools.sort_by(|(a_key, a), (b_key, b)| {
            a.start_time.cmp(&b.start_time).then_with(|| a_key.cmp(b_key))
        });
        Ok(Arc::new(pools))
    }

    /// Fetch and keep the listing that later `read_pool` calls index into
    async fn list_pools(&self) -> Result<PoolListing, ChainError> {
        let listing = self.fetch_pools().await?;
        *self.listing.lock().await = Some(listing.clone());
        Ok(listing)
    }

    /// Current state of the account `pool` was read from
    ///
    /// Ids shift when a pool with an earlier start appears, so writes go by
    /// account, never by listing position.
    async fn resolve_pool(
        &self,
        pool: &PoolRef,
    ) -> Result<(ProgramAddress, PoolAccount), ChainError> {
        let account = pool.account.ok_or(ChainError::UnboundPool(pool.id))?;
        let listing = self.fetch_pools().await?;
        listing
            .iter()
            .find(|(key, _)| *key == account)
            .cloned()
            .ok_or(ChainError::PoolNotFound(pool.id))
    }

    async fn instruction_for(
        &self,
        operation: &PoolOperation,
    ) -> Result<SignRequest, ChainError> {
        let program_id = self.config.program_id;
        let ix = match operation {
            PoolOperation::Approve { .. } => {
                return Err(ChainError::EncodingError(
                    "token allowances do not exist on this ledger".to_string(),
                ))
            }
            PoolOperation::CreatePool(params) => {
                anchor::initialize_pool(program_id, params, self.config.token_decimals)?
            }
            PoolOperation::Contribute { pool, amount } => {
                let (account, _) = self.resolve_pool(pool).await?;
                anchor::contribute(program_id, account, amount)?
            }
            PoolOperation::Finalize { pool } => {
                let (account, _) = self.resolve_pool(pool).await?;
                anchor::finalize_pool(program_id, account)
            }
            PoolOperation::Claim { pool } => {
                let (account, state) = self.resolve_pool(pool).await?;
                anchor::claim_tokens(program_id, account, &state)?
            }
        };
        Ok(SignRequest::Program(ix))
    }

    async fn wait_for_signature(&self, signature: &TxHandle) -> Result<(), ChainError> {
        let required = self.config.commitment;
        let rpc = &self.rpc;

        wait_until(&self.config.confirmation, &signature.0, move || async move {
            let Some(status) = rpc.signature_status(signature).await? else {
                return Ok(false);
            };
            if let Some(err) = status.err {
                return Err(ChainError::Rpc {
                    code: 0,
                    message: format!("transaction {signature} failed: {err}"),
                });
            }
            Ok(status
                .confirmation_status
                .is_some_and(|reached| reached >= required))
        })
        .await
    }
}

#[async_trait]
impl LedgerGateway for ProgramGateway {
    fn ledger(&self) -> LedgerKind {
        LedgerKind::Solana
    }

    fn requires_allowance(&self) -> bool {
        false
    }

    fn check_amount(&self, field: DraftField, amount: &Amount) -> Result<(), AmountError> {
        let decimals = match field {
            DraftField::TotalSupply => self.config.token_decimals,
            _ => LAMPORT_DECIMALS,
        };
        amount.to_u64(decimals).map(drop)
    }

    async fn read_pool_count(&self) -> Result<u64, ErrorKind> {
        Ok(self.list_pools().await?.len() as u64)
    }

    async fn read_pool(&self, id: u64) -> Result<PoolRecord, ErrorKind> {
        let cached = self.listing.lock().await.clone();
        let listing = match cached {
            Some(listing) if (id as usize) < listing.len() => listing,
            _ => self.list_pools().await?,
        };

        let (key, state) = listing
            .get(id as usize)
            .ok_or(ChainError::PoolNotFound(id))?;
        let mut record = state.to_record(id, self.config.token_decimals)?;
        record.account = Some(*key);
        Ok(record)
    }

    async fn submit(&self, operation: PoolOperation, signer: &SessionSigner) -> TransactionAttempt {
        let attempt = TransactionAttempt::pending(operation.kind());

        if signer.account().as_program().is_none() {
            return attempt.fail(ErrorKind::LedgerRejected(format!(
                "signer {} is not a Solana account",
                signer.account()
            )));
        }
        let request = match self.instruction_for(&operation).await {
            Ok(request) => request,
            Err(e) => return attempt.fail(e.into()),
        };

        tracing::info!(
            kind = %attempt.kind,
            program = %self.config.program_id,
            from = %signer.account(),
            "Submitting program instruction"
        );

        let signature = match signer.sign_and_send(request).await {
            Ok(signature) => signature,
            Err(failure) => {
                let err = classify(&failure);
                tracing::warn!(kind = %attempt.kind, error = %err, "Transaction not sent");
                return attempt.fail(err);
            }
        };
        let attempt = attempt.broadcast(signature.clone());

        match self.wait_for_signature(&signature).await {
            Ok(()) => {
                tracing::info!(kind = %attempt.kind, signature = %signature, "Transaction confirmed");
                attempt.confirm()
            }
            Err(e) => {
                tracing::warn!(kind = %attempt.kind, signature = %signature, error = %e, "Transaction failed");
                attempt.fail(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_session::{AccountKey, MockWalletProvider, WalletProvider};
    use launchpad_types::{Address, Amount, ChainId, RawFailure, TxKind};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCluster {
        accounts: std::sync::Mutex<Vec<ProgramAccount>>,
        statuses: std::sync::Mutex<HashMap<String, SignatureStatus>>,
        listings: AtomicUsize,
    }

    #[async_trait]
    impl ProgramRpc for FakeCluster {
        async fn program_accounts(
            &self,
            _program_id: &ProgramAddress,
            discriminator: [u8; 8],
        ) -> Result<Vec<ProgramAccount>, ChainError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|account| account.data.starts_with(&discriminator))
                .cloned()
                .collect())
        }

        async fn signature_status(
            &self,
            signature: &TxHandle,
        ) -> Result<Option<SignatureStatus>, ChainError> {
            Ok(self.statuses.lock().unwrap().get(&signature.0).cloned())
        }
    }

    fn pool(start_time: i64, seed: u8) -> ProgramAccount {
        let state = PoolAccount {
            authority: ProgramAddress::from_bytes([1; 32]),
            token_mint: ProgramAddress::from_bytes([seed; 32]),
            token_vault: ProgramAddress::from_bytes([seed.wrapping_add(100); 32]),
            start_time,
            end_time: start_time + 3_600,
            total_tokens: 1_000_000_000,
            token_price: 500_000_000,
            min_contribution: 100_000_000,
            max_contribution: 5_000_000_000,
            total_raised: 0,
            finalized: false,
            bump: 255,
        };
        ProgramAccount {
            pubkey: pool_key(seed),
            data: state.encode(),
        }
    }

    fn pool_key(seed: u8) -> ProgramAddress {
        ProgramAddress::from_bytes([seed.wrapping_add(50); 32])
    }

    fn bound(id: u64, seed: u8) -> PoolRef {
        PoolRef {
            id,
            account: Some(pool_key(seed)),
        }
    }

    fn config() -> ProgramGatewayConfig {
        ProgramGatewayConfig {
            program_id: ProgramAddress::from_bytes([9; 32]),
            token_decimals: 6,
            commitment: Commitment::Confirmed,
            confirmation: ConfirmationPolicy {
                initial_poll: Duration::from_millis(1),
                max_poll: Duration::from_millis(2),
                timeout: Duration::from_millis(100),
            },
        }
    }

    fn signer(wallet: &Arc<MockWalletProvider>) -> SessionSigner {
        SessionSigner::new(
            Address::Program(ProgramAddress::from_bytes([1; 32])),
            wallet.clone() as Arc<dyn WalletProvider>,
        )
    }

    fn wallet() -> Arc<MockWalletProvider> {
        Arc::new(MockWalletProvider::new(ChainId::new("devnet")))
    }

    fn settle(cluster: &FakeCluster, commitment: Commitment, err: Option<&str>) {
        cluster.statuses.lock().unwrap().insert(
            format!("0x{:064x}", 1),
            SignatureStatus {
                confirmation_status: Some(commitment),
                err: err.map(String::from),
            },
        );
    }

    #[tokio::test]
    async fn test_pools_are_ordered_by_start_time() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(5_000, 2), pool(1_000, 3)];
        let gateway = ProgramGateway::new(cluster.clone(), config());

        assert_eq!(gateway.read_pool_count().await.unwrap(), 2);
        let first = gateway.read_pool(0).await.unwrap();
        let second = gateway.read_pool(1).await.unwrap();

        assert_eq!(first.window_start, 1_000);
        assert_eq!(second.window_start, 5_000);
        assert_eq!(first.account, Some(pool_key(3)));
        assert_eq!(second.account, Some(pool_key(2)));
        assert_eq!(first.total_supply, Amount::parse("1000").unwrap());
        // Records come from the listing taken for the count
        assert_eq!(cluster.listings.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_pool() {
        let gateway = ProgramGateway::new(Arc::new(FakeCluster::default()), config());
        assert_eq!(
            gateway.read_pool(0).await.unwrap_err(),
            ErrorKind::LedgerRejected("pool 0 not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_contribute_targets_listed_pool() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(1_000, 2)];
        settle(&cluster, Commitment::Finalized, None);
        let wallet = wallet();
        let gateway = ProgramGateway::new(cluster, config());

        let attempt = gateway
            .submit(
                PoolOperation::Contribute {
                    pool: bound(0, 2),
                    amount: Amount::parse("2").unwrap(),
                },
                &signer(&wallet),
            )
            .await;
        assert!(attempt.is_confirmed());

        let sent = wallet.sent().await;
        let SignRequest::Program(ix) = &sent[0].1 else {
            panic!("expected a program instruction");
        };
        assert_eq!(
            ix.account("pool").unwrap().key,
            AccountKey::Known(ProgramAddress::from_bytes([52; 32]))
        );
        assert_eq!(&ix.data[8..], &2_000_000_000u64.to_le_bytes());
    }

    #[tokio::test]
    async fn test_write_follows_account_when_ids_shift() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(5_000, 2)];
        settle(&cluster, Commitment::Finalized, None);
        let wallet = wallet();
        let gateway = ProgramGateway::new(cluster.clone(), config());

        assert_eq!(gateway.read_pool_count().await.unwrap(), 1);
        let seen = gateway.read_pool(0).await.unwrap();

        // An earlier pool now takes id 0 in a fresh listing
        cluster.accounts.lock().unwrap().push(pool(1_000, 3));

        let attempt = gateway
            .submit(
                PoolOperation::Contribute {
                    pool: PoolRef::from(&seen),
                    amount: Amount::parse("1").unwrap(),
                },
                &signer(&wallet),
            )
            .await;
        assert!(attempt.is_confirmed());

        let sent = wallet.sent().await;
        let SignRequest::Program(ix) = &sent[0].1 else {
            panic!("expected a program instruction");
        };
        assert_eq!(ix.account("pool").unwrap().key, AccountKey::Known(pool_key(2)));
    }

    #[tokio::test]
    async fn test_write_without_account_is_refused() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(1_000, 2)];
        let wallet = wallet();
        let gateway = ProgramGateway::new(cluster, config());

        let attempt = gateway
            .submit(PoolOperation::Finalize { pool: PoolRef::id(0) }, &signer(&wallet))
            .await;
        assert_eq!(
            attempt.error(),
            Some(&ErrorKind::LedgerRejected(
                "pool 0 is not bound to a program account".to_string()
            ))
        );
        assert!(wallet.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_closed_pool_account_is_not_found() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(1_000, 2)];
        let gateway = ProgramGateway::new(cluster, config());

        let attempt = gateway
            .submit(PoolOperation::Finalize { pool: bound(0, 9) }, &signer(&wallet()))
            .await;
        assert_eq!(
            attempt.error(),
            Some(&ErrorKind::LedgerRejected("pool 0 not found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_commitment_level_is_respected() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(1_000, 2)];
        settle(&cluster, Commitment::Processed, None);
        let gateway = ProgramGateway::new(cluster, config());

        let attempt = gateway
            .submit(PoolOperation::Finalize { pool: bound(0, 2) }, &signer(&wallet()))
            .await;
        assert!(matches!(
            attempt.error(),
            Some(ErrorKind::LedgerRejected(message)) if message.starts_with("timeout")
        ));
    }

    #[tokio::test]
    async fn test_program_error_fails_attempt() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(1_000, 2)];
        settle(
            &cluster,
            Commitment::Confirmed,
            Some("{\"InstructionError\":[0,{\"Custom\":6007}]}"),
        );
        let gateway = ProgramGateway::new(cluster, config());

        let attempt = gateway
            .submit(PoolOperation::Claim { pool: bound(0, 2) }, &signer(&wallet()))
            .await;
        assert_eq!(attempt.kind, TxKind::Claim);
        assert!(matches!(attempt.error(), Some(ErrorKind::LedgerRejected(_))));
    }

    #[tokio::test]
    async fn test_insufficient_lamports_is_classified() {
        let cluster = Arc::new(FakeCluster::default());
        *cluster.accounts.lock().unwrap() = vec![pool(1_000, 2)];
        let wallet = wallet();
        wallet
            .fail_next_send(RawFailure::new(
                "Transfer: insufficient lamports 100, need 2000000000",
            ))
            .await;
        let gateway = ProgramGateway::new(cluster, config());

        let attempt = gateway
            .submit(
                PoolOperation::Contribute {
                    pool: bound(0, 2),
                    amount: Amount::parse("2").unwrap(),
                },
                &signer(&wallet),
            )
            .await;
        assert_eq!(attempt.error(), Some(&ErrorKind::InsufficientFunds));
    }

    #[tokio::test]
    async fn test_approve_is_not_a_program_operation() {
        let gateway = ProgramGateway::new(Arc::new(FakeCluster::default()), config());
        assert!(!gateway.requires_allowance());

        let attempt = gateway
            .submit(
                PoolOperation::Approve {
                    asset: Address::Program(ProgramAddress::from_bytes([2; 32])),
                    amount: Amount::parse("1").unwrap(),
                },
                &signer(&wallet()),
            )
            .await;
        assert!(matches!(attempt.error(), Some(ErrorKind::LedgerRejected(_))));
    }
}
