use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger family a pool registry lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Evm,
    Solana,
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerKind::Evm => f.write_str("evm"),
            LedgerKind::Solana => f.write_str("solana"),
        }
    }
}

/// Network identity as reported by a wallet
///
/// EVM chains are kept in decimal form (`"80002"`), Solana clusters by name
/// (`"devnet"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Accepts the `0x`-prefixed hex form wallets use on the wire
    pub fn from_evm_hex(hex_id: &str) -> Option<Self> {
        let body = hex_id.strip_prefix("0x")?;
        u64::from_str_radix(body, 16)
            .ok()
            .map(|n| Self(n.to_string()))
    }

    pub fn to_evm_hex(&self) -> Option<String> {
        self.0.parse::<u64>().ok().map(|n| format!("0x{n:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Fixed descriptor used to register the target network with a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl NetworkDescriptor {
    pub fn polygon_amoy() -> Self {
        Self {
            chain_id: ChainId::new("80002"),
            chain_name: "Polygon Amoy".to_string(),
            native_currency: NativeCurrency {
                name: "MATIC".to_string(),
                symbol: "MATIC".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://rpc-amoy.polygon.technology".to_string()],
            block_explorer_urls: vec!["https://www.oklink.com/amoy".to_string()],
        }
    }

    pub fn solana_devnet() -> Self {
        Self {
            chain_id: ChainId::new("devnet"),
            chain_name: "Solana Devnet".to_string(),
            native_currency: NativeCurrency {
                name: "SOL".to_string(),
                symbol: "SOL".to_string(),
                decimals: 9,
            },
            rpc_urls: vec!["https://api.devnet.solana.com".to_string()],
            block_explorer_urls: vec!["https://explorer.solana.com/?cluster=devnet".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_hex_chain_id() {
        let amoy = ChainId::from_evm_hex("0x13882").unwrap();
        assert_eq!(amoy, ChainId::new("80002"));
        assert_eq!(amoy.to_evm_hex().unwrap(), "0x13882");
        assert!(ChainId::from_evm_hex("13882").is_none());
        assert!(ChainId::new("devnet").to_evm_hex().is_none());
    }

    #[test]
    fn test_amoy_descriptor() {
        let descriptor = NetworkDescriptor::polygon_amoy();
        assert_eq!(descriptor.native_currency.symbol, "MATIC");
        assert_eq!(descriptor.rpc_urls.len(), 1);
    }
}
