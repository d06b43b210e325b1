use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use launchpad_gateway::{LedgerGateway, PoolOperation, PoolRef};
use launchpad_session::{SessionManager, SessionSigner};
use launchpad_types::{
    DraftField, ErrorKind, PoolDraft, PoolRecord, Timestamp, TransactionAttempt, ValidationReason,
};

use crate::registry::PoolRegistry;
use crate::validator::DraftValidator;

/// Progress of a pool creation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreationStage {
    Idle,
    Validating,
    /// Waiting for the allowance grant to confirm
    Approving,
    Creating,
    Done,
    Failed(ErrorKind),
}

/// Configuration for the orchestrator
#[derive(Clone, Debug, Default)]
pub struct OrchestratorConfig {
    /// Dry-run creation through the gateway before submitting it
    pub preflight: bool,
}

impl OrchestratorConfig {
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }
}

/// Drives every pool write from local checks to ledger confirmation
pub struct PoolOrchestrator {
    session: Arc<SessionManager>,
    gateway: Arc<dyn LedgerGateway>,
    registry: Arc<PoolRegistry>,
    validator: DraftValidator,
    config: OrchestratorConfig,
    stage: watch::Sender<CreationStage>,
}

impl PoolOrchestrator {
    pub fn new(
        session: Arc<SessionManager>,
        gateway: Arc<dyn LedgerGateway>,
        registry: Arc<PoolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let (stage, _) = watch::channel(CreationStage::Idle);
        Self {
            validator: DraftValidator::new(gateway.ledger()),
            session,
            gateway,
            registry,
            config,
            stage,
        }
    }

    pub fn stage(&self) -> CreationStage {
        self.stage.borrow().clone()
    }

    /// Observe creation stage transitions
    pub fn subscribe(&self) -> watch::Receiver<CreationStage> {
        self.stage.subscribe()
    }

    fn set_stage(&self, stage: CreationStage) {
        info!(stage = ?stage, "Pool creation stage");
        self.stage.send_replace(stage);
    }

    /// Validate, approve where needed, and create a pool from `draft`
    ///
    /// The draft is reset only once creation is confirmed; on any failure it
    /// is left exactly as submitted.
    pub async fn create_pool(&self, draft: &mut PoolDraft) -> Result<TransactionAttempt, ErrorKind> {
        match self.run_creation(draft).await {
            Ok(attempt) => {
                draft.reset();
                self.set_stage(CreationStage::Done);
                self.refresh_after("create_pool").await;
                Ok(attempt)
            }
            Err(err) => {
                warn!(error = %err, "Pool creation failed");
                self.set_stage(CreationStage::Failed(err.clone()));
                Err(err)
            }
        }
    }

    async fn run_creation(&self, draft: &PoolDraft) -> Result<TransactionAttempt, ErrorKind> {
        self.set_stage(CreationStage::Validating);
        let params = self.validator.validate(draft)?;
        for (field, amount) in params.amounts() {
            self.gateway
                .check_amount(field, amount)
                .map_err(|e| ValidationReason::InvalidAmount {
                    field,
                    reason: e.to_string(),
                })?;
        }
        let signer = self.session.signer().await?;

        if self.gateway.requires_allowance() {
            self.set_stage(CreationStage::Approving);
            let approve = PoolOperation::Approve {
                asset: params.sale_asset,
                amount: params.total_supply,
            };
            self.gateway.submit(approve, &signer).await.into_result()?;
        }

        self.set_stage(CreationStage::Creating);
        let create = PoolOperation::CreatePool(params);
        if self.config.preflight {
            self.gateway.simulate(&create, &signer).await?;
        }
        self.gateway.submit(create, &signer).await.into_result()
    }

    /// Contribute `amount` (native currency) to a pool
    pub async fn contribute(
        &self,
        pool_id: u64,
        amount: &str,
        now: Timestamp,
    ) -> Result<TransactionAttempt, ErrorKind> {
        let pool = self.cached_pool(pool_id).await?;
        let amount = self.validator.validate_contribution(&pool, amount, now)?;
        self.gateway
            .check_amount(DraftField::MinContribution, &amount)
            .map_err(|e| ValidationReason::InvalidContribution {
                reason: e.to_string(),
            })?;
        let signer = self.session.signer().await?;

        info!(pool_id, amount = %amount, "Submitting contribution");
        self.submit(
            PoolOperation::Contribute {
                pool: PoolRef::from(&pool),
                amount,
            },
            &signer,
        )
        .await
    }

    /// Close a pool; any connected account may call it
    pub async fn finalize(&self, pool_id: u64) -> Result<TransactionAttempt, ErrorKind> {
        let pool = self.cached_pool(pool_id).await?;
        if pool.finalized {
            return Err(ValidationReason::PoolFinalized { pool_id }.into());
        }
        let signer = self.session.signer().await?;

        info!(pool_id, "Submitting finalization");
        self.submit(
            PoolOperation::Finalize {
                pool: PoolRef::from(&pool),
            },
            &signer,
        )
        .await
    }

    /// Claim purchased tokens from a finalized pool
    pub async fn claim(&self, pool_id: u64) -> Result<TransactionAttempt, ErrorKind> {
        let pool = self.cached_pool(pool_id).await?;
        if !pool.finalized {
            return Err(ValidationReason::PoolNotFinalized { pool_id }.into());
        }
        let signer = self.session.signer().await?;

        info!(pool_id, "Submitting claim");
        self.submit(
            PoolOperation::Claim {
                pool: PoolRef::from(&pool),
            },
            &signer,
        )
        .await
    }

    async fn cached_pool(&self, pool_id: u64) -> Result<PoolRecord, ErrorKind> {
        self.registry
            .get(pool_id)
            .await
            .ok_or_else(|| ValidationReason::UnknownPool { pool_id }.into())
    }

    async fn submit(
        &self,
        operation: PoolOperation,
        signer: &SessionSigner,
    ) -> Result<TransactionAttempt, ErrorKind> {
        let kind = operation.kind();
        let attempt = self.gateway.submit(operation, signer).await.into_result()?;
        self.refresh_after(kind.as_str()).await;
        Ok(attempt)
    }

    async fn refresh_after(&self, operation: &str) {
        if let Err(err) = self.registry.refresh().await {
            warn!(operation, error = %err, "Registry refresh after confirmation failed");
        }
    }
}
