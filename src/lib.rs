//! Dual-ledger token launchpad client
//!
//! A [`Launchpad`] wires one ledger's wallet session, sale-contract gateway,
//! pool registry and lifecycle orchestrator together, records metrics for
//! every interaction, and is the only surface a rendering layer talks to.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn, Instrument};

use launchpad_config::{AppConfig, ConfirmationConfig, EvmConfig, SolanaConfig};
use launchpad_gateway::{
    ChainError, Commitment, ConfirmationPolicy, EvmGateway, EvmGatewayConfig, HttpEvmRpc,
    HttpProgramRpc, LedgerGateway, ProgramGateway, ProgramGatewayConfig,
};
use launchpad_metrics::{MetricsCollector, OperationSpan};
use launchpad_orchestrator::{
    CreationStage, OrchestratorConfig, PoolOrchestrator, PoolRegistry, PoolSnapshot,
};
use launchpad_session::{SessionEvent, SessionManager, WalletProvider, WalletSession};
use launchpad_types::{
    current_timestamp, AddressError, ChainId, ErrorKind, EvmAddress, LedgerKind, NativeCurrency,
    NetworkDescriptor, PoolDraft, PoolRecord, ProgramAddress, Timestamp, TransactionAttempt,
    TxKind,
};

pub use launchpad_config as config;
pub use launchpad_gateway as gateway;
pub use launchpad_metrics as metrics;
pub use launchpad_orchestrator as orchestrator;
pub use launchpad_session as session;
pub use launchpad_types as types;

/// Errors building a launchpad from configuration
#[derive(Debug, Error)]
pub enum LaunchpadError {
    #[error("ledger {0} is not configured")]
    LedgerNotConfigured(LedgerKind),

    #[error("invalid address in config: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("rpc client: {0}")]
    Rpc(#[from] ChainError),
}

/// Options not tied to a particular ledger
#[derive(Debug, Clone)]
pub struct LaunchpadOptions {
    pub orchestrator: OrchestratorConfig,
    /// Refresh the registry right after a successful connect
    pub refresh_on_connect: bool,
}

impl Default for LaunchpadOptions {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            refresh_on_connect: true,
        }
    }
}

type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Launchpad client for one ledger
pub struct Launchpad {
    ledger: LedgerKind,
    session: Arc<SessionManager>,
    registry: Arc<PoolRegistry>,
    orchestrator: PoolOrchestrator,
    metrics: Arc<MetricsCollector>,
    options: LaunchpadOptions,
    clock: Clock,
}

impl Launchpad {
    /// `provider` is `None` when no wallet is installed; reads still work
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        gateway: Arc<dyn LedgerGateway>,
        network: NetworkDescriptor,
        options: LaunchpadOptions,
    ) -> Self {
        let ledger = gateway.ledger();
        let session = Arc::new(SessionManager::new(provider, ledger, network));
        let registry = Arc::new(PoolRegistry::new(gateway.clone()));
        let orchestrator = PoolOrchestrator::new(
            session.clone(),
            gateway,
            registry.clone(),
            options.orchestrator.clone(),
        );

        Self {
            ledger,
            session,
            registry,
            orchestrator,
            metrics: Arc::new(MetricsCollector::new()),
            options,
            clock: Arc::new(current_timestamp),
        }
    }

    /// Build against the RPC endpoints of `ledger` in `config`
    pub fn from_config(
        config: &AppConfig,
        ledger: LedgerKind,
        provider: Option<Arc<dyn WalletProvider>>,
    ) -> Result<Self, LaunchpadError> {
        let timeout = Duration::from_millis(config.registry.request_timeout_ms);
        let (gateway, network): (Arc<dyn LedgerGateway>, NetworkDescriptor) = match ledger {
            LedgerKind::Evm => {
                let evm = config
                    .evm
                    .as_ref()
                    .ok_or(LaunchpadError::LedgerNotConfigured(ledger))?;
                (evm_gateway(evm, timeout)?, evm_network(evm))
            }
            LedgerKind::Solana => {
                let solana = config
                    .solana
                    .as_ref()
                    .ok_or(LaunchpadError::LedgerNotConfigured(ledger))?;
                (solana_gateway(solana, timeout)?, solana_network(solana))
            }
        };

        let options = LaunchpadOptions {
            orchestrator: OrchestratorConfig::default().with_preflight(config.registry.preflight),
            refresh_on_connect: config.registry.refresh_on_connect,
        };
        Ok(Self::new(provider, gateway, network, options))
    }

    /// Share a collector, e.g. the one fed by the tracing layer
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the wall clock used for contribution window checks
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn ledger(&self) -> LedgerKind {
        self.ledger
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn session(&self) -> WalletSession {
        self.session.session().await
    }

    pub async fn connect(&self) -> Result<WalletSession, ErrorKind> {
        let result = self.session.connect().await;
        self.metrics.record_connect(self.ledger, result.as_ref().err());

        match &result {
            Ok(session) => {
                info!(ledger = %self.ledger, network = ?session.network_id, "Wallet connected");
                if self.options.refresh_on_connect {
                    // A failed read leaves the snapshot as it was; the
                    // connection itself stands.
                    let _ = self.refresh().await;
                }
            }
            Err(err) => {
                warn!(ledger = %self.ledger, error_kind = err.label(), error = %err, "Wallet connection failed");
            }
        }
        result
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
        info!(ledger = %self.ledger, "Wallet disconnected");
    }

    /// Apply pending wallet notifications in arrival order
    ///
    /// A network change tears the session down and drops the registry
    /// snapshot; the caller should rebuild any view derived from it.
    pub async fn process_notifications(&self) -> Vec<SessionEvent> {
        let events = self.session.process_notifications().await;
        for event in &events {
            if let SessionEvent::ReloadRequired(chain_id) = event {
                warn!(ledger = %self.ledger, chain_id = %chain_id, "Wallet changed network, reloading");
                self.registry.clear().await;
                self.metrics.record_registry_cleared(self.ledger);
                self.metrics.record_reload(self.ledger);
            }
        }
        events
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn refresh(&self) -> Result<PoolSnapshot, ErrorKind> {
        let started = Instant::now();
        let result = self.registry.refresh().await;
        self.metrics.record_refresh(
            self.ledger,
            result.as_ref().map(|pools| pools.len()),
            started.elapsed(),
        );
        if let Err(err) = &result {
            warn!(ledger = %self.ledger, error_kind = err.label(), error = %err, "Pool refresh failed");
        }
        result
    }

    pub async fn pools(&self) -> PoolSnapshot {
        self.registry.pools().await
    }

    pub async fn pool(&self, id: u64) -> Option<PoolRecord> {
        self.registry.get(id).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WRITES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn creation_stage(&self) -> CreationStage {
        self.orchestrator.stage()
    }

    pub fn watch_creation(&self) -> watch::Receiver<CreationStage> {
        self.orchestrator.subscribe()
    }

    /// Create a pool from `draft`; the draft is emptied only on success
    pub async fn create_pool(&self, draft: &mut PoolDraft) -> Result<TransactionAttempt, ErrorKind> {
        self.track(TxKind::CreatePool, None, self.orchestrator.create_pool(draft))
            .await
    }

    /// Contribute `amount` of the native currency to pool `pool_id`
    pub async fn contribute(
        &self,
        pool_id: u64,
        amount: &str,
    ) -> Result<TransactionAttempt, ErrorKind> {
        let now = (self.clock)();
        self.track(
            TxKind::Contribute,
            Some(pool_id),
            self.orchestrator.contribute(pool_id, amount, now),
        )
        .await
    }

    pub async fn finalize(&self, pool_id: u64) -> Result<TransactionAttempt, ErrorKind> {
        self.track(
            TxKind::Finalize,
            Some(pool_id),
            self.orchestrator.finalize(pool_id),
        )
        .await
    }

    pub async fn claim(&self, pool_id: u64) -> Result<TransactionAttempt, ErrorKind> {
        self.track(TxKind::Claim, Some(pool_id), self.orchestrator.claim(pool_id))
            .await
    }

    /// Run a write inside its operation span and record its outcome
    async fn track<F>(
        &self,
        kind: TxKind,
        pool_id: Option<u64>,
        operation: F,
    ) -> Result<TransactionAttempt, ErrorKind>
    where
        F: Future<Output = Result<TransactionAttempt, ErrorKind>>,
    {
        let span = OperationSpan::new(self.ledger, kind, pool_id);
        let started = Instant::now();
        let result = operation.instrument(span.span()).await;

        match &result {
            Ok(_) => {
                self.metrics.record_submission(self.ledger, kind);
                self.metrics
                    .record_transaction(self.ledger, kind, None, started.elapsed());
                info!(correlation_id = %span.correlation_id, kind = %kind, "Operation confirmed");
            }
            Err(err) => {
                if !matches!(err, ErrorKind::ValidationFailed(_)) {
                    self.metrics.record_submission(self.ledger, kind);
                    self.metrics
                        .record_transaction(self.ledger, kind, Some(err), started.elapsed());
                }
                warn!(
                    correlation_id = %span.correlation_id,
                    kind = %kind,
                    error_kind = err.label(),
                    error = %err,
                    "Operation failed"
                );
            }
        }
        result
    }
}

fn policy(config: &ConfirmationConfig) -> ConfirmationPolicy {
    ConfirmationPolicy {
        initial_poll: Duration::from_millis(config.initial_poll_ms),
        max_poll: Duration::from_millis(config.max_poll_ms),
        timeout: Duration::from_secs(config.timeout_secs),
    }
}

fn evm_network(evm: &EvmConfig) -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: ChainId::new(evm.chain_id.to_string()),
        chain_name: evm.chain_name.clone(),
        native_currency: NativeCurrency {
            name: evm.currency.name.clone(),
            symbol: evm.currency.symbol.clone(),
            decimals: evm.currency.decimals,
        },
        rpc_urls: vec![evm.rpc_url.clone()],
        block_explorer_urls: evm.explorer_url.iter().cloned().collect(),
    }
}

fn evm_gateway(evm: &EvmConfig, timeout: Duration) -> Result<Arc<dyn LedgerGateway>, LaunchpadError> {
    let rpc = HttpEvmRpc::new(evm.rpc_url.clone(), timeout)?;
    let config = EvmGatewayConfig {
        sale_contract: evm.sale_contract.parse::<EvmAddress>()?,
        confirmations: evm.confirmations,
        confirmation: policy(&evm.confirmation),
    };
    Ok(Arc::new(EvmGateway::new(Arc::new(rpc), config)))
}

fn solana_network(solana: &SolanaConfig) -> NetworkDescriptor {
    NetworkDescriptor {
        chain_id: ChainId::new(solana.cluster.clone()),
        chain_name: format!("Solana {}", solana.cluster),
        native_currency: NativeCurrency {
            name: "SOL".to_string(),
            symbol: "SOL".to_string(),
            decimals: 9,
        },
        rpc_urls: vec![solana.rpc_url.clone()],
        block_explorer_urls: solana.explorer_url.iter().cloned().collect(),
    }
}

fn solana_gateway(
    solana: &SolanaConfig,
    timeout: Duration,
) -> Result<Arc<dyn LedgerGateway>, LaunchpadError> {
    let commitment = parse_commitment(&solana.commitment)?;
    let rpc = HttpProgramRpc::new(solana.rpc_url.clone(), commitment, timeout)?;
    let config = ProgramGatewayConfig {
        program_id: solana.program_id.parse::<ProgramAddress>()?,
        token_decimals: solana.token_decimals,
        commitment,
        confirmation: policy(&solana.confirmation),
    };
    Ok(Arc::new(ProgramGateway::new(Arc::new(rpc), config)))
}

fn parse_commitment(raw: &str) -> Result<Commitment, LaunchpadError> {
    match raw {
        "processed" => Ok(Commitment::Processed),
        "confirmed" => Ok(Commitment::Confirmed),
        "finalized" => Ok(Commitment::Finalized),
        other => Err(LaunchpadError::InvalidConfig(format!(
            "unknown commitment {other:?}"
        ))),
    }
}
