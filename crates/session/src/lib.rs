//! Wallet session management
//!
//! A [`SessionManager`] owns the one wallet connection of a launchpad
//! instance and hands out [`SessionSigner`]s to the ledger gateways.

pub mod manager;
pub mod mock;
pub mod provider;

pub use manager::*;
pub use mock::MockWalletProvider;
pub use provider::*;
