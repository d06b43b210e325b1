//! End-to-end launchpad tests against the in-memory wallet and ledger

use std::sync::Arc;
use std::time::Duration;

use launchpad::gateway::MockLedger;
use launchpad::session::{
    ConnectionState, MockWalletProvider, SessionEvent, WalletNotification, WalletProvider,
};
use launchpad::types::{
    Amount, ChainId, ErrorKind, LedgerKind, NetworkDescriptor, PoolDraft, TxKind,
    ValidationReason,
};
use launchpad::{Launchpad, LaunchpadOptions};

const EVM_ACCOUNT: &str = "0x2222222222222222222222222222222222222222";
const SALE_TOKEN: &str = "0x1111111111111111111111111111111111111111";
const T0: u64 = 1_700_000_000;

struct TestEnv {
    wallet: Arc<MockWalletProvider>,
    ledger: Arc<MockLedger>,
    launchpad: Arc<Launchpad>,
}

fn env_with(ledger: MockLedger, now: u64) -> TestEnv {
    let network = NetworkDescriptor::polygon_amoy();
    let wallet = Arc::new(
        MockWalletProvider::new(network.chain_id.clone()).with_accounts(vec![EVM_ACCOUNT]),
    );
    let ledger = Arc::new(ledger);
    ledger.set_time(now);

    let launchpad = Launchpad::new(
        Some(wallet.clone() as Arc<dyn WalletProvider>),
        ledger.clone(),
        network,
        LaunchpadOptions::default(),
    )
    .with_clock(move || now);

    TestEnv {
        wallet,
        ledger,
        launchpad: Arc::new(launchpad),
    }
}

fn env(now: u64) -> TestEnv {
    env_with(MockLedger::evm(), now)
}

fn scenario_draft() -> PoolDraft {
    PoolDraft {
        sale_asset: SALE_TOKEN.to_string(),
        window_start: T0.to_string(),
        window_end: (T0 + 3_600).to_string(),
        total_supply: "1000".to_string(),
        unit_price: "0.5".to_string(),
        min_contribution: "0.1".to_string(),
        max_contribution: "5".to_string(),
    }
}

async fn env_with_pool(now: u64) -> TestEnv {
    let env = env(now);
    env.launchpad.connect().await.unwrap();
    env.launchpad
        .create_pool(&mut scenario_draft())
        .await
        .unwrap();
    env
}

#[tokio::test]
async fn test_concurrent_refresh_reads_once() {
    let env = env_with(
        MockLedger::evm().with_read_delay(Duration::from_millis(50)),
        T0,
    );

    let (a, b) = tokio::join!(env.launchpad.refresh(), env.launchpad.refresh());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(env.ledger.count_reads(), 1);
}

#[tokio::test]
async fn test_created_pool_appears_after_refresh() {
    let env = env(T0);
    env.launchpad.connect().await.unwrap();
    let before = env.launchpad.pools().await.len();

    let mut draft = scenario_draft();
    let attempt = env.launchpad.create_pool(&mut draft).await.unwrap();

    assert!(attempt.is_confirmed());
    assert!(draft.is_empty());
    assert_eq!(env.launchpad.refresh().await.unwrap().len(), before + 1);
    assert_eq!(
        env.ledger.submitted().await,
        vec![TxKind::Approve, TxKind::CreatePool]
    );
}

#[tokio::test]
async fn test_invalid_draft_has_no_side_effects() {
    let env = env(T0);
    env.launchpad.connect().await.unwrap();

    let mut draft = PoolDraft {
        min_contribution: "6".to_string(),
        ..scenario_draft()
    };
    let err = env.launchpad.create_pool(&mut draft).await.unwrap_err();

    assert!(matches!(
        err,
        ErrorKind::ValidationFailed(ValidationReason::MinExceedsMax { .. })
    ));
    assert_eq!(draft.min_contribution, "6");
    assert!(env.ledger.submitted().await.is_empty());
}

#[tokio::test]
async fn test_amount_finer_than_wei_has_no_side_effects() {
    let env = env(T0);
    env.launchpad.connect().await.unwrap();

    let mut draft = PoolDraft {
        unit_price: "0.0000000000000000005".to_string(),
        ..scenario_draft()
    };
    let err = env.launchpad.create_pool(&mut draft).await.unwrap_err();

    assert!(matches!(
        err,
        ErrorKind::ValidationFailed(ValidationReason::InvalidAmount { .. })
    ));
    assert!(env.ledger.submitted().await.is_empty());
    assert!(env.wallet.sent().await.is_empty());
}

#[tokio::test]
async fn test_below_min_contribution_before_window_opens() {
    let env = env_with_pool(T0 - 60).await;

    let err = env.launchpad.contribute(0, "0.05").await.unwrap_err();

    assert!(matches!(
        err,
        ErrorKind::ValidationFailed(ValidationReason::BelowMinContribution { .. })
    ));
}

#[tokio::test]
async fn test_claim_before_finalize_is_not_submitted() {
    let env = env_with_pool(T0 + 10).await;
    let submitted = env.ledger.submitted().await.len();

    let err = env.launchpad.claim(0).await.unwrap_err();

    assert_eq!(
        err,
        ErrorKind::ValidationFailed(ValidationReason::PoolNotFinalized { pool_id: 0 })
    );
    assert_eq!(env.ledger.submitted().await.len(), submitted);
}

#[tokio::test]
async fn test_disconnect_during_pending_transaction() {
    let env = env_with_pool(T0 + 1_800).await;
    let release = env.wallet.hold_sends().await;

    let launchpad = env.launchpad.clone();
    let pending = tokio::spawn(async move { launchpad.contribute(0, "1").await });

    // Wait until the contribution is parked in the wallet
    while !env.ledger.submitted().await.contains(&TxKind::Contribute) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    env.launchpad.disconnect().await;
    let _ = release.send(());
    let result = pending.await.unwrap();

    assert!(result.is_ok());
    let session = env.launchpad.session().await;
    assert_eq!(session.connection_state, ConnectionState::Disconnected);
    assert!(session.account_address.is_none());
    assert!(!env.wallet.is_subscribed().await);
}

#[tokio::test]
async fn test_contribution_scenario() {
    let env = env_with_pool(T0 + 1_800).await;

    let err = env.launchpad.contribute(0, "0.05").await.unwrap_err();
    assert!(matches!(
        err,
        ErrorKind::ValidationFailed(ValidationReason::BelowMinContribution { .. })
    ));

    env.launchpad.contribute(0, "2").await.unwrap();
    let pool = env.launchpad.pool(0).await.unwrap();
    assert_eq!(pool.total_raised, Amount::parse("2").unwrap());

    // Raised 2 of a 500 hard cap; finalizing early is still accepted
    env.launchpad.finalize(0).await.unwrap();
    let pool = env.launchpad.pool(0).await.unwrap();
    assert!(pool.finalized);
    assert!(pool.total_raised < pool.hard_cap().unwrap());

    env.launchpad.claim(0).await.unwrap();
}

#[tokio::test]
async fn test_network_change_clears_registry() {
    let env = env_with_pool(T0).await;
    assert_eq!(env.launchpad.pools().await.len(), 1);

    assert!(
        env.wallet
            .emit(WalletNotification::NetworkChanged(ChainId::new("1")))
            .await
    );
    let events = env.launchpad.process_notifications().await;

    assert_eq!(events, vec![SessionEvent::ReloadRequired(ChainId::new("1"))]);
    assert!(env.launchpad.pools().await.is_empty());
    assert!(!env.launchpad.session().await.is_connected());
}

#[tokio::test]
async fn test_missing_provider() {
    let launchpad = Launchpad::new(
        None,
        Arc::new(MockLedger::solana()),
        NetworkDescriptor::solana_devnet(),
        LaunchpadOptions::default(),
    );

    assert_eq!(
        launchpad.connect().await.unwrap_err(),
        ErrorKind::ProviderMissing
    );
    assert_eq!(launchpad.ledger(), LedgerKind::Solana);
    // Reads need no wallet
    assert!(launchpad.refresh().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_operations_are_recorded() {
    let env = env_with_pool(T0 + 1_800).await;
    env.launchpad.contribute(0, "1").await.unwrap();

    let metrics = env.launchpad.metrics().export_metrics().unwrap();
    assert!(metrics.contains("launchpad_transaction_outcomes_total"));
    assert!(metrics.contains("contribute"));
}
