//! Pool lifecycle flows for the launchpad client
//!
//! [`PoolOrchestrator`] runs local validation, allowance approval, creation,
//! contribution, finalization and claims through a [`LedgerGateway`], and
//! keeps a [`PoolRegistry`] snapshot in step with confirmed writes.
//!
//! [`LedgerGateway`]: launchpad_gateway::LedgerGateway

pub mod orchestrator;
pub mod registry;
pub mod validator;


pub use orchestrator::{CreationStage, OrchestratorConfig, PoolOrchestrator};
pub use registry::{PoolRegistry, PoolSnapshot};
pub use validator::{parse_timestamp, DraftValidator};
