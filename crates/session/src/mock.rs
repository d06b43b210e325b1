use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

use launchpad_types::{
    Address, ChainId, NetworkDescriptor, RawFailure, TxHandle, UNRECOGNIZED_CHAIN_CODE,
};

use crate::{SignRequest, WalletNotification, WalletProvider};

/// Scriptable in-memory wallet for testing
pub struct MockWalletProvider {
    accounts: RwLock<Vec<String>>,
    network: RwLock<ChainId>,
    known_networks: RwLock<HashSet<ChainId>>,
    account_failure: RwLock<Option<RawFailure>>,
    switch_failure: Option<RawFailure>,
    register_failure: Option<RawFailure>,
    send_failures: Mutex<Vec<RawFailure>>,
    account_gate: Mutex<Option<oneshot::Receiver<()>>>,
    send_gate: Mutex<Option<oneshot::Receiver<()>>>,
    subscriber: Mutex<Option<mpsc::UnboundedSender<WalletNotification>>>,
    sent: Mutex<Vec<(Address, SignRequest)>>,
    account_requests: AtomicUsize,
    switch_calls: AtomicUsize,
    register_calls: AtomicUsize,
    tx_counter: AtomicUsize,
}

impl MockWalletProvider {
    /// Wallet currently on `network`, which it also knows how to switch to
    pub fn new(network: ChainId) -> Self {
        let mut known = HashSet::new();
        known.insert(network.clone());
        Self {
            accounts: RwLock::new(Vec::new()),
            network: RwLock::new(network),
            known_networks: RwLock::new(known),
            account_failure: RwLock::new(None),
            switch_failure: None,
            register_failure: None,
            send_failures: Mutex::new(Vec::new()),
            account_gate: Mutex::new(None),
            send_gate: Mutex::new(None),
            subscriber: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            account_requests: AtomicUsize::new(0),
            switch_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            tx_counter: AtomicUsize::new(0),
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<&str>) -> Self {
        *self.accounts.get_mut() = accounts.into_iter().map(String::from).collect();
        self
    }

    pub fn with_known_network(mut self, chain_id: ChainId) -> Self {
        self.known_networks.get_mut().insert(chain_id);
        self
    }

    pub fn with_switch_failure(mut self, failure: RawFailure) -> Self {
        self.switch_failure = Some(failure);
        self
    }

    pub fn with_register_failure(mut self, failure: RawFailure) -> Self {
        self.register_failure = Some(failure);
        self
    }

    pub async fn fail_account_requests(&self, failure: RawFailure) {
        *self.account_failure.write().await = Some(failure);
    }

    /// Fail the next `sign_and_send` with `failure`
    pub async fn fail_next_send(&self, failure: RawFailure) {
        self.send_failures.lock().await.push(failure);
    }

    /// Park the next account request until the returned sender fires
    pub async fn hold_account_requests(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.account_gate.lock().await = Some(rx);
        tx
    }

    /// Park the next `sign_and_send` until the returned sender fires
    pub async fn hold_sends(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.send_gate.lock().await = Some(rx);
        tx
    }

    /// Deliver a notification to the current subscriber, if any
    pub async fn emit(&self, notification: WalletNotification) -> bool {
        match self.subscriber.lock().await.as_ref() {
            Some(sender) => sender.send(notification).is_ok(),
            None => false,
        }
    }

    pub async fn is_subscribed(&self) -> bool {
        self.subscriber.lock().await.is_some()
    }

    pub async fn current_network(&self) -> ChainId {
        self.network.read().await.clone()
    }

    pub async fn sent(&self) -> Vec<(Address, SignRequest)> {
        self.sent.lock().await.clone()
    }

    pub fn account_requests(&self) -> usize {
        self.account_requests.load(Ordering::SeqCst)
    }

    pub fn switch_calls(&self) -> usize {
        self.switch_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, RawFailure> {
        self.account_requests.fetch_add(1, Ordering::SeqCst);

        let gate = self.account_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(failure) = self.account_failure.read().await.clone() {
            return Err(failure);
        }
        Ok(self.accounts.read().await.clone())
    }

    async fn active_network(&self) -> Result<ChainId, RawFailure> {
        Ok(self.network.read().await.clone())
    }

    async fn switch_network(&self, chain_id: &ChainId) -> Result<(), RawFailure> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = &self.switch_failure {
            return Err(failure.clone());
        }
        if !self.known_networks.read().await.contains(chain_id) {
            return Err(RawFailure::with_code(
                UNRECOGNIZED_CHAIN_CODE,
                format!("Unrecognized chain ID \"{chain_id}\""),
            ));
        }

        *self.network.write().await = chain_id.clone();
        Ok(())
    }

    async fn register_network(&self, descriptor: &NetworkDescriptor) -> Result<(), RawFailure> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = &self.register_failure {
            return Err(failure.clone());
        }
        self.known_networks
            .write()
            .await
            .insert(descriptor.chain_id.clone());
        Ok(())
    }

    async fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscriber.lock().await = Some(tx);
        rx
    }

    async fn unsubscribe(&self) {
        self.subscriber.lock().await.take();
    }

    async fn sign_and_send(
        &self,
        account: &Address,
        request: SignRequest,
    ) -> Result<TxHandle, RawFailure> {
        let gate = self.send_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        {
            let mut failures = self.send_failures.lock().await;
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        self.sent.lock().await.push((*account, request));
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHandle(format!("0x{n:064x}")))
    }
}
