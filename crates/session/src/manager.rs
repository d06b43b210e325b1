use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use launchpad_types::{
    classify, classify_network_failure, Address, ChainId, ErrorKind, LedgerKind,
    NetworkDescriptor, ValidationReason,
};

use crate::{SessionSigner, WalletNotification, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Wallet connection as observed by the rest of the client
///
/// `account_address` is set iff `connection_state` is `Connected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub account_address: Option<Address>,
    pub network_id: Option<ChainId>,
    pub connection_state: ConnectionState,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self {
            account_address: None,
            network_id: None,
            connection_state: ConnectionState::Disconnected,
        }
    }

    fn connecting() -> Self {
        Self {
            connection_state: ConnectionState::Connecting,
            ..Self::disconnected()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Outcome of handling one wallet notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    AccountChanged(Address),
    Disconnected,
    /// The wallet moved to another network; dependent state must be dropped
    ReloadRequired(ChainId),
}

/// Owns the single wallet connection of a launchpad instance
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    ledger: LedgerKind,
    target: NetworkDescriptor,
    session: RwLock<WalletSession>,
    notifications: Mutex<Option<mpsc::UnboundedReceiver<WalletNotification>>>,
    /// Bumped by `disconnect()`; a connect attempt only commits in its own epoch
    epoch: AtomicU64,
}

impl SessionManager {
    /// `provider` is `None` when no wallet is installed
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        ledger: LedgerKind,
        target: NetworkDescriptor,
    ) -> Self {
        Self {
            provider,
            ledger,
            target,
            session: RwLock::new(WalletSession::disconnected()),
            notifications: Mutex::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn ledger(&self) -> LedgerKind {
        self.ledger
    }

    pub fn target_network(&self) -> &NetworkDescriptor {
        &self.target
    }

    pub async fn session(&self) -> WalletSession {
        self.session.read().await.clone()
    }

    /// Authorize an account and bring the wallet onto the target network
    ///
    /// On failure the session is restored to what it was before the call.
    /// Calling while a connection attempt is in flight returns the current
    /// snapshot without side effects. A `disconnect()` issued while the
    /// attempt is pending wins: the attempt neither connects nor restores,
    /// and returns the disconnected snapshot or its own error.
    pub async fn connect(&self) -> Result<WalletSession, ErrorKind> {
        let provider = self.provider.clone().ok_or(ErrorKind::ProviderMissing)?;

        let (previous, epoch) = {
            let mut session = self.session.write().await;
            if session.connection_state == ConnectionState::Connecting {
                tracing::debug!("Connect already in progress, ignoring");
                return Ok(session.clone());
            }
            let previous = std::mem::replace(&mut *session, WalletSession::connecting());
            (previous, self.epoch.load(Ordering::SeqCst))
        };

        tracing::info!(
            ledger = %self.ledger,
            target = %self.target.chain_id,
            "Connecting wallet session"
        );

        let outcome = self.establish(provider.as_ref()).await;

        let mut session = self.session.write().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!("Wallet disconnected while connecting, discarding attempt");
            return outcome.map(|_| session.clone());
        }

        match outcome {
            Ok((account, network)) => {
                let receiver = provider.subscribe().await;
                *self.notifications.lock().await = Some(receiver);

                let connected = WalletSession {
                    account_address: Some(account),
                    network_id: Some(network),
                    connection_state: ConnectionState::Connected,
                };
                *session = connected.clone();

                tracing::info!(
                    account = %account,
                    network = %self.target.chain_id,
                    "Wallet session connected"
                );
                Ok(connected)
            }
            Err(err) => {
                *session = previous;
                tracing::warn!(error = %err, "Wallet connection failed");
                Err(err)
            }
        }
    }

    async fn establish(
        &self,
        provider: &dyn WalletProvider,
    ) -> Result<(Address, ChainId), ErrorKind> {
        let accounts = provider
            .request_accounts()
            .await
            .map_err(|failure| classify(&failure))?;

        let raw_account = accounts.first().ok_or(ErrorKind::UserRejected)?;
        let account = self.parse_account(raw_account)?;

        let network = self.ensure_network(provider).await?;
        Ok((account, network))
    }

    async fn ensure_network(&self, provider: &dyn WalletProvider) -> Result<ChainId, ErrorKind> {
        let target = &self.target.chain_id;
        let active = provider
            .active_network()
            .await
            .map_err(|failure| classify_network_failure(&failure))?;

        if &active == target {
            return Ok(active);
        }

        tracing::info!(active = %active, target = %target, "Switching wallet network");

        match provider.switch_network(target).await {
            Ok(()) => {}
            Err(failure) if failure.is_unrecognized_chain() => {
                tracing::info!(
                    chain_name = %self.target.chain_name,
                    "Wallet does not know target network, registering it"
                );
                provider
                    .register_network(&self.target)
                    .await
                    .map_err(|failure| classify_network_failure(&failure))?;
                provider
                    .switch_network(target)
                    .await
                    .map_err(|failure| classify_network_failure(&failure))?;
            }
            Err(failure) => return Err(classify_network_failure(&failure)),
        }

        Ok(target.clone())
    }

    fn parse_account(&self, raw: &str) -> Result<Address, ErrorKind> {
        Address::parse(self.ledger, raw).map_err(|err| {
            ErrorKind::LedgerRejected(format!("wallet returned unusable account: {err}"))
        })
    }

    /// Clear the session and stop listening for wallet notifications
    pub async fn disconnect(&self) {
        {
            let mut session = self.session.write().await;
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *session = WalletSession::disconnected();
        }
        self.notifications.lock().await.take();

        if let Some(provider) = &self.provider {
            provider.unsubscribe().await;
        }

        tracing::info!("Wallet session disconnected");
    }

    /// Current signing authority
    pub async fn signer(&self) -> Result<SessionSigner, ErrorKind> {
        let session = self.session.read().await;
        match (&self.provider, session.account_address, session.is_connected()) {
            (Some(provider), Some(account), true) => {
                Ok(SessionSigner::new(account, provider.clone()))
            }
            _ => Err(ErrorKind::validation(ValidationReason::WalletNotConnected)),
        }
    }

    /// Apply queued wallet notifications in arrival order
    ///
    /// Stops at the first notification that tears the session down; anything
    /// queued behind it belongs to the discarded session.
    pub async fn process_notifications(&self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        loop {
            let next = {
                let mut guard = self.notifications.lock().await;
                match guard.as_mut() {
                    Some(receiver) => receiver.try_recv().ok(),
                    None => None,
                }
            };

            let Some(notification) = next else {
                break;
            };

            match notification {
                WalletNotification::AccountsChanged(accounts) => match accounts.first() {
                    None => {
                        tracing::info!("Wallet revoked all accounts");
                        self.disconnect().await;
                        events.push(SessionEvent::Disconnected);
                        break;
                    }
                    Some(raw) => match self.parse_account(raw) {
                        Ok(account) => {
                            let mut session = self.session.write().await;
                            if session.is_connected() {
                                session.account_address = Some(account);
                                tracing::info!(account = %account, "Wallet account changed");
                                events.push(SessionEvent::AccountChanged(account));
                            }
                        }
                        Err(err) => {
                            tracing::warn!(account = %raw, error = %err, "Ignoring account change");
                        }
                    },
                },
                WalletNotification::NetworkChanged(chain_id) => {
                    tracing::info!(network = %chain_id, "Wallet network changed, reload required");
                    self.disconnect().await;
                    events.push(SessionEvent::ReloadRequired(chain_id));
                    break;
                }
            }
        }

        events
    }
}
