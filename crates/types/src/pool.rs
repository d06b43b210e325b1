use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, Amount, ProgramAddress};

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Snapshot of a sale pool as stored on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Ledger-assigned index, dense from zero
    pub id: u64,
    pub sale_asset: Address,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub total_supply: Amount,
    pub unit_price: Amount,
    pub min_contribution: Amount,
    pub max_contribution: Amount,
    pub total_raised: Amount,
    pub finalized: bool,
    /// Account holding the pool, on ledgers that keep one account per pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<ProgramAddress>,
}

impl PoolRecord {
    /// Whether `now` falls inside the inclusive contribution window
    pub fn is_open_at(&self, now: Timestamp) -> bool {
        now >= self.window_start && now <= self.window_end
    }

    /// Raise at which the whole supply is sold
    pub fn hard_cap(&self) -> Option<Amount> {
        self.total_supply.checked_mul(self.unit_price)
    }
}

/// Form fields of a pool before submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDraft {
    pub sale_asset: String,
    pub window_start: String,
    pub window_end: String,
    pub total_supply: String,
    pub unit_price: String,
    pub min_contribution: String,
    pub max_contribution: String,
}

impl PoolDraft {
    pub fn is_empty(&self) -> bool {
        *self == PoolDraft::default()
    }

    pub fn reset(&mut self) {
        *self = PoolDraft::default();
    }

    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::SaleAsset => &self.sale_asset,
            DraftField::WindowStart => &self.window_start,
            DraftField::WindowEnd => &self.window_end,
            DraftField::TotalSupply => &self.total_supply,
            DraftField::UnitPrice => &self.unit_price,
            DraftField::MinContribution => &self.min_contribution,
            DraftField::MaxContribution => &self.max_contribution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    SaleAsset,
    WindowStart,
    WindowEnd,
    TotalSupply,
    UnitPrice,
    MinContribution,
    MaxContribution,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DraftField::SaleAsset => "sale_asset",
            DraftField::WindowStart => "window_start",
            DraftField::WindowEnd => "window_end",
            DraftField::TotalSupply => "total_supply",
            DraftField::UnitPrice => "unit_price",
            DraftField::MinContribution => "min_contribution",
            DraftField::MaxContribution => "max_contribution",
        };
        f.write_str(name)
    }
}

/// Validated pool terms ready for the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub sale_asset: Address,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub total_supply: Amount,
    pub unit_price: Amount,
    pub min_contribution: Amount,
    pub max_contribution: Amount,
}

impl PoolParams {
    /// Amount fields in draft order
    pub fn amounts(&self) -> [(DraftField, &Amount); 4] {
        [
            (DraftField::TotalSupply, &self.total_supply),
            (DraftField::UnitPrice, &self.unit_price),
            (DraftField::MinContribution, &self.min_contribution),
            (DraftField::MaxContribution, &self.max_contribution),
        ]
    }
}
