//! Instruction and account encoding for the Anchor `launchpad` program.

use sha2::{Digest, Sha256};
use std::str::FromStr;

use launchpad_session::{AccountKey, AccountMeta, BumpSlot, ProgramInstruction, Seed};
use launchpad_types::{
    Address, Amount, PoolParams, PoolRecord, ProgramAddress, Timestamp, LAMPORT_DECIMALS,
};

use crate::ChainError;

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const RENT_SYSVAR: &str = "SysvarRent111111111111111111111111111111111";

pub const POOL_SEED: &[u8] = b"pool";
pub const CONTRIBUTION_SEED: &[u8] = b"contribution";

/// Discriminator plus the serialized `Pool` fields
pub const POOL_ACCOUNT_LEN: usize = 8 + 32 * 3 + 8 * 7 + 1 + 1;

fn discriminator(preimage: &str) -> [u8; 8] {
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator(&format!("global:{name}"))
}

pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator(&format!("account:{name}"))
}

/// On-chain `Pool` account state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAccount {
    pub authority: ProgramAddress,
    pub token_mint: ProgramAddress,
    pub token_vault: ProgramAddress,
    pub start_time: i64,
    pub end_time: i64,
    pub total_tokens: u64,
    pub token_price: u64,
    pub min_contribution: u64,
    pub max_contribution: u64,
    pub total_raised: u64,
    pub finalized: bool,
    pub bump: u8,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], ChainError> {
        let end = self.pos + N;
        let slice = self.data.get(self.pos..end).ok_or_else(|| {
            ChainError::InvalidResponse(format!(
                "pool account truncated at byte {} of {}",
                self.pos,
                self.data.len()
            ))
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn pubkey(&mut self) -> Result<ProgramAddress, ChainError> {
        Ok(ProgramAddress::from_bytes(self.take::<32>()?))
    }

    fn i64(&mut self) -> Result<i64, ChainError> {
        Ok(i64::from_le_bytes(self.take::<8>()?))
    }

    fn u64(&mut self) -> Result<u64, ChainError> {
        Ok(u64::from_le_bytes(self.take::<8>()?))
    }

    fn u8(&mut self) -> Result<u8, ChainError> {
        Ok(self.take::<1>()?[0])
    }

    fn bool(&mut self) -> Result<bool, ChainError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ChainError::InvalidResponse(format!("{other} is not a bool"))),
        }
    }
}

impl PoolAccount {
    pub fn decode(data: &[u8]) -> Result<Self, ChainError> {
        let mut reader = Reader { data, pos: 0 };
        if reader.take::<8>()? != account_discriminator("Pool") {
            return Err(ChainError::InvalidResponse(
                "account is not a launchpad pool".to_string(),
            ));
        }

        Ok(Self {
            authority: reader.pubkey()?,
            token_mint: reader.pubkey()?,
            token_vault: reader.pubkey()?,
            start_time: reader.i64()?,
            end_time: reader.i64()?,
            total_tokens: reader.u64()?,
            token_price: reader.u64()?,
            min_contribution: reader.u64()?,
            max_contribution: reader.u64()?,
            total_raised: reader.u64()?,
            finalized: reader.bool()?,
            bump: reader.u8()?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(POOL_ACCOUNT_LEN);
        data.extend_from_slice(&account_discriminator("Pool"));
        data.extend_from_slice(self.authority.as_bytes());
        data.extend_from_slice(self.token_mint.as_bytes());
        data.extend_from_slice(self.token_vault.as_bytes());
        data.extend_from_slice(&self.start_time.to_le_bytes());
        data.extend_from_slice(&self.end_time.to_le_bytes());
        for value in [
            self.total_tokens,
            self.token_price,
            self.min_contribution,
            self.max_contribution,
            self.total_raised,
        ] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.push(self.finalized as u8);
        data.push(self.bump);
        data
    }

    /// Ledger-neutral view; token supply uses the mint's decimals, prices
    /// and contributions are lamports
    pub fn to_record(&self, id: u64, token_decimals: u32) -> Result<PoolRecord, ChainError> {
        let lamports = |value: u64| {
            Amount::from_u64(value, LAMPORT_DECIMALS)
                .map_err(|e| ChainError::InvalidResponse(e.to_string()))
        };

        Ok(PoolRecord {
            id,
            sale_asset: Address::Program(self.token_mint),
            window_start: to_timestamp(self.start_time)?,
            window_end: to_timestamp(self.end_time)?,
            total_supply: Amount::from_u64(self.total_tokens, token_decimals)
                .map_err(|e| ChainError::InvalidResponse(e.to_string()))?,
            unit_price: lamports(self.token_price)?,
            min_contribution: lamports(self.min_contribution)?,
            max_contribution: lamports(self.max_contribution)?,
            total_raised: lamports(self.total_raised)?,
            finalized: self.finalized,
            account: None,
        })
    }
}

fn to_timestamp(value: i64) -> Result<Timestamp, ChainError> {
    Timestamp::try_from(value)
        .map_err(|_| ChainError::InvalidResponse(format!("negative timestamp {value}")))
}

fn from_timestamp(value: Timestamp) -> Result<i64, ChainError> {
    i64::try_from(value)
        .map_err(|_| ChainError::EncodingError(format!("timestamp {value} out of range")))
}

fn base_units(amount: &Amount, decimals: u32) -> Result<u64, ChainError> {
    amount
        .to_u64(decimals)
        .map_err(|e| ChainError::EncodingError(e.to_string()))
}

pub fn well_known(id: &str) -> Result<ProgramAddress, ChainError> {
    ProgramAddress::from_str(id).map_err(|e| ChainError::EncodingError(e.to_string()))
}

fn pool_pda(mint: ProgramAddress) -> AccountKey {
    AccountKey::Derived(vec![
        Seed::literal(POOL_SEED),
        Seed::Key(AccountKey::Known(mint)),
    ])
}

fn contribution_pda(pool: ProgramAddress) -> AccountKey {
    AccountKey::Derived(vec![
        Seed::literal(CONTRIBUTION_SEED),
        Seed::Key(AccountKey::Known(pool)),
        Seed::Key(AccountKey::Authority),
    ])
}

pub fn initialize_pool(
    program_id: ProgramAddress,
    params: &PoolParams,
    token_decimals: u32,
) -> Result<ProgramInstruction, ChainError> {
    let mint = *params.sale_asset.as_program().ok_or_else(|| {
        ChainError::EncodingError(format!("{} is not a token mint", params.sale_asset))
    })?;

    let mut data = instruction_discriminator("initialize_pool").to_vec();
    // pool_bump, filled in by the wallet
    data.push(0);
    data.extend_from_slice(&from_timestamp(params.window_start)?.to_le_bytes());
    data.extend_from_slice(&from_timestamp(params.window_end)?.to_le_bytes());
    data.extend_from_slice(&base_units(&params.total_supply, token_decimals)?.to_le_bytes());
    for amount in [
        &params.unit_price,
        &params.min_contribution,
        &params.max_contribution,
    ] {
        data.extend_from_slice(&base_units(amount, LAMPORT_DECIMALS)?.to_le_bytes());
    }

    Ok(ProgramInstruction {
        program_id,
        accounts: vec![
            AccountMeta::writable("authority", AccountKey::Authority).signer(),
            AccountMeta::readonly("token_mint", AccountKey::Known(mint)),
            AccountMeta::writable("pool", pool_pda(mint)),
            AccountMeta::writable("token_vault", AccountKey::NewKeypair).signer(),
            AccountMeta::writable(
                "authority_token_account",
                AccountKey::AssociatedToken {
                    owner: Box::new(AccountKey::Authority),
                    mint,
                },
            ),
            AccountMeta::readonly("system_program", AccountKey::Known(well_known(SYSTEM_PROGRAM)?)),
            AccountMeta::readonly("token_program", AccountKey::Known(well_known(TOKEN_PROGRAM)?)),
            AccountMeta::readonly("rent", AccountKey::Known(well_known(RENT_SYSVAR)?)),
        ],
        data,
        bump_slot: Some(BumpSlot {
            account: "pool".to_string(),
            offset: 8,
        }),
    })
}

pub fn contribute(
    program_id: ProgramAddress,
    pool: ProgramAddress,
    amount: &Amount,
) -> Result<ProgramInstruction, ChainError> {
    let mut data = instruction_discriminator("contribute").to_vec();
    data.extend_from_slice(&base_units(amount, LAMPORT_DECIMALS)?.to_le_bytes());

    Ok(ProgramInstruction {
        program_id,
        accounts: vec![
            AccountMeta::writable("pool", AccountKey::Known(pool)),
            AccountMeta::writable("user_contribution", contribution_pda(pool)),
            AccountMeta::writable("contributor", AccountKey::Authority).signer(),
            AccountMeta::readonly("system_program", AccountKey::Known(well_known(SYSTEM_PROGRAM)?)),
        ],
        data,
        bump_slot: None,
    })
}

/// Raised lamports are held on the pool account itself
pub fn finalize_pool(program_id: ProgramAddress, pool: ProgramAddress) -> ProgramInstruction {
    ProgramInstruction {
        program_id,
        accounts: vec![
            AccountMeta::writable("pool", AccountKey::Known(pool)),
            AccountMeta::writable("pool_vault", AccountKey::Known(pool)),
            AccountMeta::writable("authority", AccountKey::Authority).signer(),
        ],
        data: instruction_discriminator("finalize_pool").to_vec(),
        bump_slot: None,
    }
}

pub fn claim_tokens(
    program_id: ProgramAddress,
    pool: ProgramAddress,
    state: &PoolAccount,
) -> Result<ProgramInstruction, ChainError> {
    Ok(ProgramInstruction {
        program_id,
        accounts: vec![
            AccountMeta::writable("pool", AccountKey::Known(pool)),
            AccountMeta::writable("user_contribution", contribution_pda(pool)),
            AccountMeta::writable("token_vault", AccountKey::Known(state.token_vault)),
            AccountMeta::writable(
                "user_token_account",
                AccountKey::AssociatedToken {
                    owner: Box::new(AccountKey::Authority),
                    mint: state.token_mint,
                },
            ),
            AccountMeta::readonly("user", AccountKey::Authority).signer(),
            AccountMeta::readonly("token_program", AccountKey::Known(well_known(TOKEN_PROGRAM)?)),
        ],
        data: instruction_discriminator("claim_tokens").to_vec(),
        bump_slot: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> PoolAccount {
        PoolAccount {
            authority: ProgramAddress::from_bytes([1; 32]),
            token_mint: ProgramAddress::from_bytes([2; 32]),
            token_vault: ProgramAddress::from_bytes([3; 32]),
            start_time: 1_000,
            end_time: 4_600,
            total_tokens: 1_000_000_000,
            token_price: 500_000_000,
            min_contribution: 100_000_000,
            max_contribution: 5_000_000_000,
            total_raised: 2_000_000_000,
            finalized: false,
            bump: 254,
        }
    }

    #[test]
    fn test_discriminators() {
        assert_eq!(
            instruction_discriminator("initialize_pool"),
            [95, 180, 10, 172, 84, 174, 232, 40]
        );
        assert_eq!(
            instruction_discriminator("contribute"),
            [82, 33, 68, 131, 32, 0, 205, 95]
        );
        assert_eq!(
            instruction_discriminator("finalize_pool"),
            [74, 182, 193, 101, 92, 152, 202, 142]
        );
        assert_eq!(
            instruction_discriminator("claim_tokens"),
            [108, 216, 210, 231, 0, 212, 42, 64]
        );
        assert_eq!(
            account_discriminator("Pool"),
            [241, 154, 109, 4, 17, 177, 109, 188]
        );
    }

    #[test]
    fn test_pool_account_layout() {
        let account = sample_account();
        let data = account.encode();
        assert_eq!(data.len(), POOL_ACCOUNT_LEN);
        assert_eq!(PoolAccount::decode(&data).unwrap(), account);
    }

    #[test]
    fn test_decode_rejects_foreign_account() {
        let mut data = sample_account().encode();
        data[0] ^= 0xff;
        assert!(PoolAccount::decode(&data).is_err());
        assert!(PoolAccount::decode(&sample_account().encode()[..100]).is_err());
    }

    #[test]
    fn test_record_uses_lamports_and_mint_decimals() {
        let record = sample_account().to_record(2, 6).unwrap();
        assert_eq!(record.id, 2);
        assert_eq!(record.total_supply, Amount::parse("1000").unwrap());
        assert_eq!(record.unit_price, Amount::parse("0.5").unwrap());
        assert_eq!(record.total_raised, Amount::parse("2").unwrap());
        assert_eq!(
            record.sale_asset,
            Address::Program(ProgramAddress::from_bytes([2; 32]))
        );
    }

    #[test]
    fn test_well_known_programs_decode() {
        assert_eq!(well_known(SYSTEM_PROGRAM).unwrap().as_bytes(), &[0u8; 32]);
        assert!(well_known(TOKEN_PROGRAM).is_ok());
        assert!(well_known(RENT_SYSVAR).is_ok());
    }

    #[test]
    fn test_initialize_pool_instruction() {
        let params = PoolParams {
            sale_asset: Address::Program(ProgramAddress::from_bytes([2; 32])),
            window_start: 1_000,
            window_end: 4_600,
            total_supply: Amount::parse("1000").unwrap(),
            unit_price: Amount::parse("0.5").unwrap(),
            min_contribution: Amount::parse("0.1").unwrap(),
            max_contribution: Amount::parse("5").unwrap(),
        };
        let ix = initialize_pool(ProgramAddress::from_bytes([9; 32]), &params, 6).unwrap();

        assert_eq!(ix.data.len(), 8 + 1 + 8 * 6);
        assert_eq!(&ix.data[9..17], &1_000i64.to_le_bytes());
        assert_eq!(&ix.data[25..33], &1_000_000_000u64.to_le_bytes());
        assert_eq!(&ix.data[33..41], &500_000_000u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 8);
        assert!(ix.account("token_vault").unwrap().signer);
        assert_eq!(ix.bump_slot.as_ref().unwrap().account, "pool");
    }

    #[test]
    fn test_claim_uses_pool_vault() {
        let account = sample_account();
        let pool = ProgramAddress::from_bytes([7; 32]);
        let ix = claim_tokens(ProgramAddress::from_bytes([9; 32]), pool, &account).unwrap();

        assert_eq!(ix.data, instruction_discriminator("claim_tokens").to_vec());
        assert_eq!(
            ix.account("token_vault").unwrap().key,
            AccountKey::Known(account.token_vault)
        );
    }

    #[test]
    fn test_contribute_rejects_sub_lamport_amount() {
        let err = contribute(
            ProgramAddress::from_bytes([9; 32]),
            ProgramAddress::from_bytes([7; 32]),
            &Amount::parse("0.0000000001").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::EncodingError(_)));
    }
}
