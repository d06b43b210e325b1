use cosmwasm_std::Uint256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimals used for ether-denominated values on EVM chains
pub const EVM_DECIMALS: u32 = 18;

/// Decimals used for lamport-denominated values on Solana
pub const LAMPORT_DECIMALS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("not a decimal number: {0}")]
    Invalid(String),

    #[error("amount must not be negative: {0}")]
    Negative(String),

    #[error("{value} has more than {decimals} decimal places")]
    TooPrecise { value: String, decimals: u32 },

    #[error("amount out of range: {0}")]
    OutOfRange(String),
}

/// Non-negative human-readable amount (e.g. `0.5` MATIC)
///
/// Every component except the gateways works in this representation; the
/// smallest-unit integer form only exists at the ledger boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value.to_string()));
        }
        Ok(Self(value.normalize()))
    }

    /// Parse user input such as `"0.5"` or `" 1000 "`
    pub fn parse(raw: &str) -> Result<Self, AmountError> {
        let trimmed = raw.trim();
        let value =
            Decimal::from_str(trimmed).map_err(|_| AmountError::Invalid(raw.to_string()))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_mul(self, other: Amount) -> Option<Amount> {
        self.0.checked_mul(other.0).map(|v| Amount(v.normalize()))
    }

    /// Integer digits of this amount scaled by `10^decimals`
    pub fn to_base_units(&self, decimals: u32) -> Result<String, AmountError> {
        let normalized = self.0.normalize();
        let scale = normalized.scale();
        if scale > decimals {
            return Err(AmountError::TooPrecise {
                value: normalized.to_string(),
                decimals,
            });
        }

        let mantissa = normalized.mantissa();
        if mantissa == 0 {
            return Ok("0".to_string());
        }

        let mut digits = mantissa.to_string();
        digits.extend(std::iter::repeat('0').take((decimals - scale) as usize));
        Ok(digits)
    }

    pub fn to_uint256(&self, decimals: u32) -> Result<Uint256, AmountError> {
        let digits = self.to_base_units(decimals)?;
        Uint256::from_str(&digits).map_err(|_| AmountError::OutOfRange(digits))
    }

    pub fn to_u64(&self, decimals: u32) -> Result<u64, AmountError> {
        let digits = self.to_base_units(decimals)?;
        digits
            .parse::<u64>()
            .map_err(|_| AmountError::OutOfRange(digits))
    }

    /// Inverse of [`Amount::to_base_units`]
    ///
    /// Values with more significant digits than a `Decimal` holds are
    /// rejected as out of range instead of being rounded.
    pub fn from_base_units(digits: &str, decimals: u32) -> Result<Self, AmountError> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(digits.to_string()));
        }

        let trimmed = digits.trim_start_matches('0');
        let trimmed = if trimmed.is_empty() { "0" } else { trimmed };

        let places = decimals as usize;
        let text = if places == 0 {
            trimmed.to_string()
        } else {
            let padded = format!("{trimmed:0>width$}", width = places + 1);
            let (int_part, frac_part) = padded.split_at(padded.len() - places);
            format!("{int_part}.{frac_part}")
        };

        let out_of_range = || AmountError::OutOfRange(digits.to_string());
        let amount = Decimal::from_str(&text)
            .map_err(|_| out_of_range())
            .and_then(Self::new)?;
        match amount.to_base_units(decimals) {
            Ok(exact) if exact == trimmed => Ok(amount),
            _ => Err(out_of_range()),
        }
    }

    pub fn from_uint256(value: Uint256, decimals: u32) -> Result<Self, AmountError> {
        Self::from_base_units(&value.to_string(), decimals)
    }

    pub fn from_u64(value: u64, decimals: u32) -> Result<Self, AmountError> {
        Self::from_base_units(&value.to_string(), decimals)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.normalize().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amounts() {
        assert_eq!(Amount::parse(" 1000 ").unwrap().to_string(), "1000");
        assert_eq!(Amount::parse("0.50").unwrap().to_string(), "0.5");
        assert!(Amount::parse("0").unwrap().is_zero());
        assert!(matches!(Amount::parse("-1"), Err(AmountError::Negative(_))));
        assert!(matches!(Amount::parse("abc"), Err(AmountError::Invalid(_))));
        assert!(matches!(Amount::parse(""), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn test_to_base_units_ether() {
        let half = Amount::parse("0.5").unwrap();
        assert_eq!(half.to_base_units(EVM_DECIMALS).unwrap(), "500000000000000000");

        let supply = Amount::parse("1000").unwrap();
        assert_eq!(
            supply.to_uint256(EVM_DECIMALS).unwrap(),
            Uint256::from_u128(1_000_000_000_000_000_000_000)
        );
        assert_eq!(Amount::ZERO.to_base_units(EVM_DECIMALS).unwrap(), "0");
    }

    #[test]
    fn test_to_base_units_rejects_extra_precision() {
        let tiny = Amount::parse("0.0000000001").unwrap();
        assert!(matches!(
            tiny.to_u64(LAMPORT_DECIMALS),
            Err(AmountError::TooPrecise { .. })
        ));
        assert_eq!(tiny.to_base_units(EVM_DECIMALS).unwrap(), "100000000");
    }

    #[test]
    fn test_to_u64_overflow() {
        let huge = Amount::parse("100000000000").unwrap();
        assert!(matches!(
            huge.to_u64(LAMPORT_DECIMALS),
            Err(AmountError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_from_base_units() {
        assert_eq!(
            Amount::from_base_units("2000000000000000000", EVM_DECIMALS)
                .unwrap()
                .to_string(),
            "2"
        );
        assert_eq!(
            Amount::from_u64(100_000_000, LAMPORT_DECIMALS).unwrap().to_string(),
            "0.1"
        );
        assert_eq!(
            Amount::from_base_units("0005", 0).unwrap().to_string(),
            "5"
        );
        assert!(Amount::from_base_units("0", EVM_DECIMALS).unwrap().is_zero());
        assert!(matches!(
            Amount::from_base_units("12a", 2),
            Err(AmountError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_base_units_rejects_lossy_values() {
        // 30 significant digits do not fit a Decimal mantissa
        let digits = "123456789012345678901234567890";
        assert_eq!(
            Amount::from_base_units(digits, EVM_DECIMALS),
            Err(AmountError::OutOfRange(digits.to_string()))
        );

        let wei = Uint256::from_str(digits).unwrap();
        assert!(matches!(
            Amount::from_uint256(wei, EVM_DECIMALS),
            Err(AmountError::OutOfRange(_))
        ));

        // 28 digits still round-trip
        let exact = "1234567890123456789012345678";
        let amount = Amount::from_base_units(exact, EVM_DECIMALS).unwrap();
        assert_eq!(amount.to_base_units(EVM_DECIMALS).unwrap(), exact);
    }

    #[test]
    fn test_from_uint256() {
        let wei = Uint256::from_u128(1_500_000_000_000_000_000);
        assert_eq!(
            Amount::from_uint256(wei, EVM_DECIMALS).unwrap(),
            Amount::parse("1.5").unwrap()
        );
    }

    #[test]
    fn test_amount_ordering() {
        let min = Amount::parse("0.1").unwrap();
        let max = Amount::parse("5").unwrap();
        assert!(min < max);
        assert!(Amount::parse("0.05").unwrap() < min);
    }
}
