//! Configuration structures for the launchpad client

use serde::{Deserialize, Serialize};

/// Main application configuration
///
/// Each ledger section is optional; a launchpad instance is only built for
/// ledgers that are configured.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Solidity sale contract on an EVM chain
    #[serde(default)]
    pub evm: Option<EvmConfig>,

    /// Anchor sale program on a Solana cluster
    #[serde(default)]
    pub solana: Option<SolanaConfig>,

    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Testnet,
    #[default]
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Native currency as registered with the wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmConfig {
    /// Decimal chain id, e.g. 80002 for Polygon Amoy
    pub chain_id: u64,

    pub chain_name: String,

    pub rpc_url: String,

    #[serde(default)]
    pub explorer_url: Option<String>,

    pub currency: CurrencyConfig,

    /// Address of the deployed sale contract
    pub sale_contract: String,

    /// Blocks, counting the inclusion block, before a write is confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// Cluster name as reported by the wallet (devnet, testnet, mainnet-beta)
    pub cluster: String,

    pub rpc_url: String,

    #[serde(default)]
    pub explorer_url: Option<String>,

    /// Base58 id of the deployed sale program
    pub program_id: String,

    /// Decimals of the sale token mint
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,

    /// processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

/// Polling schedule while waiting for a write to land
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_initial_poll_ms")]
    pub initial_poll_ms: u64,

    #[serde(default = "default_max_poll_ms")]
    pub max_poll_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Per-request timeout for ledger reads
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Refresh the pool list as soon as a wallet connects
    #[serde(default = "default_true")]
    pub refresh_on_connect: bool,

    /// Dry-run pool creation before submitting it
    #[serde(default)]
    pub preflight: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_confirmations() -> u64 {
    1
}

fn default_token_decimals() -> u32 {
    9
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_initial_poll_ms() -> u64 {
    500
}

fn default_max_poll_ms() -> u64 {
    5000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            initial_poll_ms: default_initial_poll_ms(),
            max_poll_ms: default_max_poll_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            refresh_on_connect: default_true(),
            preflight: false,
        }
    }
}

impl EvmConfig {
    /// Polygon Amoy testnet with the given sale contract
    pub fn polygon_amoy(sale_contract: impl Into<String>) -> Self {
        Self {
            chain_id: 80002,
            chain_name: "Polygon Amoy".to_string(),
            rpc_url: "https://rpc-amoy.polygon.technology".to_string(),
            explorer_url: Some("https://www.oklink.com/amoy".to_string()),
            currency: CurrencyConfig {
                name: "MATIC".to_string(),
                symbol: "MATIC".to_string(),
                decimals: 18,
            },
            sale_contract: sale_contract.into(),
            confirmations: default_confirmations(),
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl SolanaConfig {
    /// Solana devnet with the given program id
    pub fn devnet(program_id: impl Into<String>) -> Self {
        Self {
            cluster: "devnet".to_string(),
            rpc_url: "https://api.devnet.solana.com".to_string(),
            explorer_url: Some("https://explorer.solana.com/?cluster=devnet".to_string()),
            program_id: program_id.into(),
            token_decimals: default_token_decimals(),
            commitment: default_commitment(),
            confirmation: ConfirmationConfig::default(),
        }
    }
}
