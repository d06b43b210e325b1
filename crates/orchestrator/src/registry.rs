use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use launchpad_gateway::LedgerGateway;
use launchpad_types::{ErrorKind, PoolRecord};

pub type PoolSnapshot = Arc<Vec<PoolRecord>>;

type RefreshFuture = Shared<BoxFuture<'static, Result<PoolSnapshot, ErrorKind>>>;

struct InFlight {
    seq: u64,
    generation: u64,
    future: RefreshFuture,
}

/// Client-side list of all pools read from the ledger
///
/// The snapshot is only replaced by a successful refresh and only dropped by
/// [`PoolRegistry::clear`].
pub struct PoolRegistry {
    gateway: Arc<dyn LedgerGateway>,
    snapshot: RwLock<PoolSnapshot>,
    in_flight: Mutex<Option<InFlight>>,
    /// Bumped by `clear()` so refreshes started before a reload are discarded
    generation: AtomicU64,
    next_seq: AtomicU64,
}

impl PoolRegistry {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            gateway,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Re-read every pool from the ledger
    ///
    /// Concurrent callers join the read already in flight and all observe
    /// its result. On failure the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<PoolSnapshot, ErrorKind> {
        let (seq, generation, future) = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(current) => {
                    debug!(seq = current.seq, "Joining in-flight registry refresh");
                    (current.seq, current.generation, current.future.clone())
                }
                None => {
                    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                    let generation = self.generation.load(Ordering::SeqCst);
                    let future = read_all(self.gateway.clone()).boxed().shared();
                    *in_flight = Some(InFlight {
                        seq,
                        generation,
                        future: future.clone(),
                    });
                    (seq, generation, future)
                }
            }
        };

        let result = future.await;

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.as_ref().is_some_and(|current| current.seq == seq) {
                *in_flight = None;
            }
        }

        match &result {
            Ok(pools) if self.generation.load(Ordering::SeqCst) == generation => {
                let mut snapshot = self.snapshot.write().await;
                if !Arc::ptr_eq(&*snapshot, pools) {
                    info!(pool_count = pools.len(), "Pool registry refreshed");
                    *snapshot = pools.clone();
                }
            }
            Ok(_) => {
                debug!(seq, "Discarding refresh started before registry was cleared");
            }
            Err(err) => {
                warn!(error = %err, "Pool registry refresh failed, keeping previous snapshot");
            }
        }

        result
    }

    /// Current point-in-time list
    pub async fn pools(&self) -> PoolSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn get(&self, id: u64) -> Option<PoolRecord> {
        self.snapshot
            .read()
            .await
            .iter()
            .find(|pool| pool.id == id)
            .cloned()
    }

    /// Drop the snapshot, e.g. after the wallet switched networks
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.snapshot.write().await = Arc::new(Vec::new());
        info!("Pool registry cleared");
    }
}

async fn read_all(gateway: Arc<dyn LedgerGateway>) -> Result<PoolSnapshot, ErrorKind> {
    let count = gateway.read_pool_count().await?;
    let mut pools = Vec::new();
    for id in 0..count {
        pools.push(gateway.read_pool(id).await?);
    }
    Ok(Arc::new(pools))
}
