use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::LedgerKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("evm address must be 0x followed by 40 hex characters: {0}")]
    InvalidEvm(String),

    #[error("invalid base58 {value}: {reason}")]
    InvalidBase58 { value: String, reason: String },

    #[error("program address must decode to 32 bytes, got {len}: {value}")]
    InvalidLength { value: String, len: usize },
}

/// 20-byte account or contract address on an EVM chain
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress([u8; 20]);

impl EvmAddress {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for EvmAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressError::InvalidEvm(s.to_string()))?;
        if body.len() != 40 {
            return Err(AddressError::InvalidEvm(s.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|_| AddressError::InvalidEvm(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EvmAddress({self})")
    }
}

/// 32-byte Solana account key, rendered in base58
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramAddress([u8; 32]);

impl ProgramAddress {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for ProgramAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let decoded = base58_decode(s)?;
        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength {
                value: s.to_string(),
                len: decoded.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ProgramAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.0))
    }
}

impl fmt::Debug for ProgramAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramAddress({self})")
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(EvmAddress);
string_serde!(ProgramAddress);

/// Address on one of the supported ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Evm(EvmAddress),
    Program(ProgramAddress),
}

impl Address {
    /// Parse `raw` with the address syntax of `ledger`
    pub fn parse(ledger: LedgerKind, raw: &str) -> Result<Self, AddressError> {
        match ledger {
            LedgerKind::Evm => raw.parse().map(Address::Evm),
            LedgerKind::Solana => raw.parse().map(Address::Program),
        }
    }

    pub fn ledger(&self) -> LedgerKind {
        match self {
            Address::Evm(_) => LedgerKind::Evm,
            Address::Program(_) => LedgerKind::Solana,
        }
    }

    pub fn as_evm(&self) -> Option<&EvmAddress> {
        match self {
            Address::Evm(addr) => Some(addr),
            Address::Program(_) => None,
        }
    }

    pub fn as_program(&self) -> Option<&ProgramAddress> {
        match self {
            Address::Program(addr) => Some(addr),
            Address::Evm(_) => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Evm(addr) => addr.fmt(f),
            Address::Program(addr) => addr.fmt(f),
        }
    }
}

pub fn base58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

pub fn base58_decode(s: &str) -> Result<Vec<u8>, AddressError> {
    bs58::decode(s)
        .into_vec()
        .map_err(|err| AddressError::InvalidBase58 {
            value: s.to_string(),
            reason: err.to_string(),
        })
}
