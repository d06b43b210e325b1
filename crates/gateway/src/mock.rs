use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use launchpad_session::{SessionSigner, SignRequest};
use launchpad_types::{
    classify, Address, Amount, AmountError, DraftField, ErrorKind, EvmAddress, LedgerKind,
    PoolRecord, ProgramAddress, RawFailure, Timestamp, TransactionAttempt, TxKind, EVM_DECIMALS,
    LAMPORT_DECIMALS,
};

use crate::{abi, anchor, LedgerGateway, PoolOperation, PoolRef};

#[derive(Default)]
struct MockState {
    pools: Vec<PoolRecord>,
    allowances: HashMap<(Address, Address), Amount>,
    contributions: HashMap<(u64, Address), Amount>,
    submitted: Vec<TxKind>,
    read_failure: Option<RawFailure>,
    simulate_failure: Option<RawFailure>,
    reported_count: Option<u64>,
}

/// In-memory sale contract for testing
///
/// Enforces the contract's own rules (allowance, window, limits,
/// finalization) so client-side checks can be exercised against a ledger
/// that would accept what the client lets through. Finalization is allowed
/// at any time.
pub struct MockLedger {
    ledger: LedgerKind,
    state: RwLock<MockState>,
    now: AtomicU64,
    read_delay: Duration,
    count_reads: AtomicUsize,
    pool_reads: AtomicUsize,
}

impl MockLedger {
    pub fn new(ledger: LedgerKind) -> Self {
        Self {
            ledger,
            state: RwLock::new(MockState::default()),
            now: AtomicU64::new(0),
            read_delay: Duration::ZERO,
            count_reads: AtomicUsize::new(0),
            pool_reads: AtomicUsize::new(0),
        }
    }

    pub fn evm() -> Self {
        Self::new(LedgerKind::Evm)
    }

    pub fn solana() -> Self {
        Self::new(LedgerKind::Solana)
    }

    /// Delay every read by `delay`
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Ledger clock used for window checks
    pub fn set_time(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub async fn insert_pool(&self, mut pool: PoolRecord) -> u64 {
        let mut state = self.state.write().await;
        pool.id = state.pools.len() as u64;
        if self.ledger == LedgerKind::Solana && pool.account.is_none() {
            pool.account = Some(pool_account(pool.id));
        }
        let id = pool.id;
        state.pools.push(pool);
        id
    }

    pub async fn pool(&self, id: u64) -> Option<PoolRecord> {
        self.state.read().await.pools.get(id as usize).cloned()
    }

    pub async fn fail_reads(&self, failure: Option<RawFailure>) {
        self.state.write().await.read_failure = failure;
    }

    /// Report `count` pools regardless of how many exist
    pub async fn report_count(&self, count: Option<u64>) {
        self.state.write().await.reported_count = count;
    }

    pub async fn fail_simulation(&self, failure: Option<RawFailure>) {
        self.state.write().await.simulate_failure = failure;
    }

    pub async fn submitted(&self) -> Vec<TxKind> {
        self.state.read().await.submitted.clone()
    }

    pub fn count_reads(&self) -> usize {
        self.count_reads.load(Ordering::SeqCst)
    }

    pub fn pool_reads(&self) -> usize {
        self.pool_reads.load(Ordering::SeqCst)
    }

    async fn before_read(&self) -> Result<(), ErrorKind> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        match &self.state.read().await.read_failure {
            Some(failure) => Err(classify(failure)),
            None => Ok(()),
        }
    }

    fn request_for(&self, operation: &PoolOperation) -> Result<SignRequest, ErrorKind> {
        let request = match self.ledger {
            LedgerKind::Evm => {
                SignRequest::Evm(abi::encode_operation(operation, &mock_contract())?)
            }
            LedgerKind::Solana => {
                let program = ProgramAddress::from_bytes([0xcc; 32]);
                let key = |pool: &PoolRef| pool.account.unwrap_or_else(|| pool_account(pool.id));
                let ix = match operation {
                    PoolOperation::CreatePool(params) => {
                        anchor::initialize_pool(program, params, 9)?
                    }
                    PoolOperation::Contribute { pool, amount } => {
                        anchor::contribute(program, key(pool), amount)?
                    }
                    PoolOperation::Finalize { pool } => anchor::finalize_pool(program, key(pool)),
                    PoolOperation::Claim { pool } => {
                        let state = anchor::PoolAccount {
                            authority: program,
                            token_mint: ProgramAddress::from_bytes([0xdd; 32]),
                            token_vault: ProgramAddress::from_bytes([0xee; 32]),
                            start_time: 0,
                            end_time: 0,
                            total_tokens: 0,
                            token_price: 0,
                            min_contribution: 0,
                            max_contribution: 0,
                            total_raised: 0,
                            finalized: true,
                            bump: 0,
                        };
                        anchor::claim_tokens(program, key(pool), &state)?
                    }
                    PoolOperation::Approve { .. } => {
                        return Err(ErrorKind::LedgerRejected(
                            "token allowances do not exist on this ledger".to_string(),
                        ))
                    }
                };
                SignRequest::Program(ix)
            }
        };
        Ok(request)
    }

    /// Apply a signed operation the way the contract would
    async fn execute(&self, operation: &PoolOperation, sender: Address) -> Result<(), RawFailure> {
        let now = self.now.load(Ordering::SeqCst);
        let mut state = self.state.write().await;

        match operation {
            PoolOperation::Approve { asset, amount } => {
                state.allowances.insert((*asset, sender), *amount);
            }
            PoolOperation::CreatePool(params) => {
                if self.ledger == LedgerKind::Evm {
                    let key = (params.sale_asset, sender);
                    let allowance = state.allowances.get(&key).copied().unwrap_or(Amount::ZERO);
                    if allowance < params.total_supply {
                        return Err(RawFailure::new("ERC20: insufficient allowance"));
                    }
                    state.allowances.remove(&key);
                }
                let id = state.pools.len() as u64;
                state.pools.push(PoolRecord {
                    id,
                    sale_asset: params.sale_asset,
                    window_start: params.window_start,
                    window_end: params.window_end,
                    total_supply: params.total_supply,
                    unit_price: params.unit_price,
                    min_contribution: params.min_contribution,
                    max_contribution: params.max_contribution,
                    total_raised: Amount::ZERO,
                    finalized: false,
                    account: (self.ledger == LedgerKind::Solana).then(|| pool_account(id)),
                });
            }
            PoolOperation::Contribute { pool, amount } => {
                let index = locate(&state, pool)?;
                let record = state.pools[index].clone();
                if !record.is_open_at(now) {
                    return Err(RawFailure::new("execution reverted: Pool not active"));
                }
                if record.finalized {
                    return Err(RawFailure::new("execution reverted: Pool already finalized"));
                }
                if *amount < record.min_contribution {
                    return Err(RawFailure::new("execution reverted: Below min contribution"));
                }
                let previous = state
                    .contributions
                    .get(&(record.id, sender))
                    .copied()
                    .unwrap_or(Amount::ZERO);
                let total = previous
                    .checked_add(*amount)
                    .filter(|total| *total <= record.max_contribution)
                    .ok_or_else(|| RawFailure::new("execution reverted: Exceeds max contribution"))?;
                let raised = record
                    .total_raised
                    .checked_add(*amount)
                    .ok_or_else(|| RawFailure::new("execution reverted: overflow"))?;

                state.contributions.insert((record.id, sender), total);
                state.pools[index].total_raised = raised;
            }
            PoolOperation::Finalize { pool } => {
                let index = locate(&state, pool)?;
                let record = &mut state.pools[index];
                if record.finalized {
                    return Err(RawFailure::new("execution reverted: Pool already finalized"));
                }
                record.finalized = true;
            }
            PoolOperation::Claim { pool } => {
                let index = locate(&state, pool)?;
                let record = &state.pools[index];
                if !record.finalized {
                    return Err(RawFailure::new("execution reverted: Pool not finalized"));
                }
                let id = record.id;
                let contributed = state
                    .contributions
                    .remove(&(id, sender))
                    .filter(|amount| !amount.is_zero());
                if contributed.is_none() {
                    return Err(RawFailure::new("execution reverted: No contribution"));
                }
            }
        }

        Ok(())
    }
}

fn mock_contract() -> EvmAddress {
    EvmAddress::from_bytes([0xcc; 20])
}

/// Account the mock keeps Solana pool `id` in
fn pool_account(id: u64) -> ProgramAddress {
    let mut key = [0u8; 32];
    key[24..].copy_from_slice(&id.to_be_bytes());
    ProgramAddress::from_bytes(key)
}

/// Index of the pool a write names; an account, when given, wins over the id
fn locate(state: &MockState, pool: &PoolRef) -> Result<usize, RawFailure> {
    let index = match pool.account {
        Some(account) => state
            .pools
            .iter()
            .position(|record| record.account == Some(account)),
        None => Some(pool.id as usize).filter(|id| *id < state.pools.len()),
    };
    index.ok_or_else(|| RawFailure::new("execution reverted: Invalid pool"))
}

#[async_trait]
impl LedgerGateway for MockLedger {
    fn ledger(&self) -> LedgerKind {
        self.ledger
    }

    fn requires_allowance(&self) -> bool {
        self.ledger == LedgerKind::Evm
    }

    fn check_amount(&self, _field: DraftField, amount: &Amount) -> Result<(), AmountError> {
        match self.ledger {
            LedgerKind::Evm => amount.to_uint256(EVM_DECIMALS).map(drop),
            LedgerKind::Solana => amount.to_u64(LAMPORT_DECIMALS).map(drop),
        }
    }

    async fn read_pool_count(&self) -> Result<u64, ErrorKind> {
        self.count_reads.fetch_add(1, Ordering::SeqCst);
        self.before_read().await?;
        let state = self.state.read().await;
        Ok(state.reported_count.unwrap_or(state.pools.len() as u64))
    }

    async fn read_pool(&self, id: u64) -> Result<PoolRecord, ErrorKind> {
        self.pool_reads.fetch_add(1, Ordering::SeqCst);
        self.before_read().await?;
        self.pool(id)
            .await
            .ok_or_else(|| ErrorKind::LedgerRejected(format!("pool {id} not found")))
    }

    async fn submit(&self, operation: PoolOperation, signer: &SessionSigner) -> TransactionAttempt {
        let attempt = TransactionAttempt::pending(operation.kind());
        self.state.write().await.submitted.push(attempt.kind);

        let request = match self.request_for(&operation) {
            Ok(request) => request,
            Err(err) => return attempt.fail(err),
        };
        let handle = match signer.sign_and_send(request).await {
            Ok(handle) => handle,
            Err(failure) => return attempt.fail(classify(&failure)),
        };
        let attempt = attempt.broadcast(handle);

        match self.execute(&operation, *signer.account()).await {
            Ok(()) => attempt.confirm(),
            Err(failure) => attempt.fail(classify(&failure)),
        }
    }

    async fn simulate(
        &self,
        _operation: &PoolOperation,
        _signer: &SessionSigner,
    ) -> Result<(), ErrorKind> {
        match &self.state.read().await.simulate_failure {
            Some(failure) => Err(classify(failure)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchpad_session::{MockWalletProvider, WalletProvider};
    use launchpad_types::{ChainId, PoolParams};
    use std::sync::Arc;

    const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

    fn signer() -> SessionSigner {
        SessionSigner::new(
            Address::parse(LedgerKind::Evm, ACCOUNT).unwrap(),
            Arc::new(MockWalletProvider::new(ChainId::new("80002"))) as Arc<dyn WalletProvider>,
        )
    }

    fn params() -> PoolParams {
        PoolParams {
            sale_asset: Address::Evm(EvmAddress::from_bytes([0x11; 20])),
            window_start: 1_000,
            window_end: 4_600,
            total_supply: Amount::parse("1000").unwrap(),
            unit_price: Amount::parse("0.5").unwrap(),
            min_contribution: Amount::parse("0.1").unwrap(),
            max_contribution: Amount::parse("5").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_requires_allowance() {
        let ledger = MockLedger::evm();
        let signer = signer();

        let attempt = ledger
            .submit(PoolOperation::CreatePool(params()), &signer)
            .await;
        assert_eq!(attempt.error(), Some(&ErrorKind::InsufficientAllowance));

        let approve = PoolOperation::Approve {
            asset: params().sale_asset,
            amount: params().total_supply,
        };
        assert!(ledger.submit(approve, &signer).await.is_confirmed());
        assert!(ledger
            .submit(PoolOperation::CreatePool(params()), &signer)
            .await
            .is_confirmed());
        assert_eq!(ledger.read_pool_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_contribution_rules() {
        let ledger = MockLedger::solana();
        let signer = signer();
        assert!(ledger
            .submit(PoolOperation::CreatePool(PoolParams {
                sale_asset: Address::Program(ProgramAddress::from_bytes([2; 32])),
                ..params()
            }), &signer)
            .await
            .is_confirmed());

        let contribute = |amount: &str| PoolOperation::Contribute {
            pool: PoolRef::id(0),
            amount: Amount::parse(amount).unwrap(),
        };

        ledger.set_time(500);
        assert!(ledger.submit(contribute("1"), &signer).await.error().is_some());

        ledger.set_time(2_000);
        assert!(ledger.submit(contribute("4"), &signer).await.is_confirmed());
        let over = ledger.submit(contribute("2"), &signer).await;
        assert_eq!(
            over.error(),
            Some(&ErrorKind::LedgerRejected(
                "execution reverted: Exceeds max contribution".to_string()
            ))
        );
        assert_eq!(
            ledger.pool(0).await.unwrap().total_raised,
            Amount::parse("4").unwrap()
        );
    }

    #[tokio::test]
    async fn test_claim_after_finalize_once() {
        let ledger = MockLedger::solana();
        let signer = signer();
        ledger
            .submit(PoolOperation::CreatePool(PoolParams {
                sale_asset: Address::Program(ProgramAddress::from_bytes([2; 32])),
                ..params()
            }), &signer)
            .await;
        ledger.set_time(2_000);
        ledger
            .submit(
                PoolOperation::Contribute {
                    pool: PoolRef::id(0),
                    amount: Amount::parse("1").unwrap(),
                },
                &signer,
            )
            .await;

        assert!(ledger
            .submit(PoolOperation::Claim { pool: PoolRef::id(0) }, &signer)
            .await
            .error()
            .is_some());
        assert!(ledger
            .submit(PoolOperation::Finalize { pool: PoolRef::id(0) }, &signer)
            .await
            .is_confirmed());
        assert!(ledger
            .submit(PoolOperation::Claim { pool: PoolRef::id(0) }, &signer)
            .await
            .is_confirmed());
        assert!(ledger
            .submit(PoolOperation::Claim { pool: PoolRef::id(0) }, &signer)
            .await
            .error()
            .is_some());
    }

    #[tokio::test]
    async fn test_read_failure_injection() {
        let ledger = MockLedger::evm();
        ledger
            .fail_reads(Some(RawFailure::new("connection refused")))
            .await;
        assert_eq!(
            ledger.read_pool_count().await.unwrap_err(),
            ErrorKind::LedgerRejected("connection refused".to_string())
        );
        assert_eq!(ledger.count_reads(), 1);
    }
}
