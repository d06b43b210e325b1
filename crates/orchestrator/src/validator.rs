use chrono::{DateTime, NaiveDateTime};

use launchpad_types::{
    Address, Amount, DraftField, LedgerKind, PoolDraft, PoolParams, PoolRecord, Timestamp,
    ValidationReason,
};

const AMOUNT_FIELDS: [DraftField; 4] = [
    DraftField::TotalSupply,
    DraftField::UnitPrice,
    DraftField::MinContribution,
    DraftField::MaxContribution,
];

/// Local checks run before anything is sent to a wallet or ledger
pub struct DraftValidator {
    ledger: LedgerKind,
}

impl DraftValidator {
    pub fn new(ledger: LedgerKind) -> Self {
        Self { ledger }
    }

    /// Validate a pool draft, converting it into typed parameters
    ///
    /// Rules run in a fixed order and the first violation is returned.
    pub fn validate(&self, draft: &PoolDraft) -> Result<PoolParams, ValidationReason> {
        // 1. Sale asset address
        let sale_asset = self.validate_asset(draft)?;

        // 2. Window presence
        for field in [DraftField::WindowStart, DraftField::WindowEnd] {
            if draft.field(field).trim().is_empty() {
                return Err(ValidationReason::MissingWindow { field });
            }
        }

        // 3. Window order
        let (window_start, window_end) = self.validate_window(draft)?;

        // 4. Amounts
        let mut amounts = [Amount::ZERO; 4];
        for (slot, field) in amounts.iter_mut().zip(AMOUNT_FIELDS) {
            *slot = parse_amount(draft, field)?;
        }
        let [total_supply, unit_price, min_contribution, max_contribution] = amounts;

        // 5. Contribution limits
        if min_contribution > max_contribution {
            return Err(ValidationReason::MinExceedsMax {
                min: min_contribution,
                max: max_contribution,
            });
        }

        Ok(PoolParams {
            sale_asset,
            window_start,
            window_end,
            total_supply,
            unit_price,
            min_contribution,
            max_contribution,
        })
    }

    fn validate_asset(&self, draft: &PoolDraft) -> Result<Address, ValidationReason> {
        Address::parse(self.ledger, draft.sale_asset.trim()).map_err(|_| {
            ValidationReason::InvalidAssetAddress {
                value: draft.sale_asset.clone(),
                ledger: self.ledger,
            }
        })
    }

    fn validate_window(&self, draft: &PoolDraft) -> Result<(Timestamp, Timestamp), ValidationReason> {
        let parse = |field: DraftField| {
            let raw = draft.field(field);
            parse_timestamp(raw).ok_or_else(|| ValidationReason::InvalidTimestamp {
                field,
                value: raw.to_string(),
            })
        };
        let start = parse(DraftField::WindowStart)?;
        let end = parse(DraftField::WindowEnd)?;

        if start >= end {
            return Err(ValidationReason::WindowNotOrdered { start, end });
        }
        Ok((start, end))
    }

    /// Best-effort checks on a contribution against the cached pool state
    ///
    /// The ledger remains the authority; this only avoids submissions that
    /// are certain to fail.
    pub fn validate_contribution(
        &self,
        pool: &PoolRecord,
        raw_amount: &str,
        now: Timestamp,
    ) -> Result<Amount, ValidationReason> {
        if pool.finalized {
            return Err(ValidationReason::PoolFinalized { pool_id: pool.id });
        }

        let amount = Amount::parse(raw_amount).map_err(|e| {
            ValidationReason::InvalidContribution {
                reason: e.to_string(),
            }
        })?;
        if amount.is_zero() {
            return Err(ValidationReason::InvalidContribution {
                reason: "amount must be positive".to_string(),
            });
        }
        if amount < pool.min_contribution {
            return Err(ValidationReason::BelowMinContribution {
                amount,
                min: pool.min_contribution,
            });
        }
        if amount > pool.max_contribution {
            return Err(ValidationReason::AboveMaxContribution {
                amount,
                max: pool.max_contribution,
            });
        }
        if !pool.is_open_at(now) {
            return Err(ValidationReason::OutsideWindow {
                pool_id: pool.id,
                start: pool.window_start,
                end: pool.window_end,
                now,
            });
        }

        Ok(amount)
    }
}

fn parse_amount(draft: &PoolDraft, field: DraftField) -> Result<Amount, ValidationReason> {
    let raw = draft.field(field);
    if raw.trim().is_empty() {
        return Err(ValidationReason::MissingAmount { field });
    }
    Amount::parse(raw).map_err(|e| ValidationReason::InvalidAmount {
        field,
        reason: e.to_string(),
    })
}

/// Parse a window boundary
///
/// Accepts unix seconds, RFC 3339, or `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().ok();
    }

    let seconds = match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.timestamp(),
        Err(_) => ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?
            .and_utc()
            .timestamp(),
    };
    u64::try_from(seconds).ok()
}
