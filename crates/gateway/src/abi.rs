//! Solidity ABI encoding for the sale contract and ERC-20 `approve`.

use cosmwasm_std::Uint256;

use launchpad_session::EvmTransaction;
use launchpad_types::{
    Address, Amount, AmountError, EvmAddress, PoolRecord, EVM_DECIMALS,
};

use crate::{ChainError, PoolOperation};

pub const POOL_COUNT: [u8; 4] = [0xf5, 0x25, 0xcb, 0x68];
pub const POOLS: [u8; 4] = [0xac, 0x4a, 0xfa, 0x38];
pub const CREATE_POOL: [u8; 4] = [0x24, 0x06, 0xe6, 0x26];
pub const CONTRIBUTE: [u8; 4] = [0xc1, 0xcb, 0xbc, 0xa7];
pub const FINALIZE_POOL: [u8; 4] = [0xc5, 0xa1, 0xf4, 0x34];
pub const CLAIM_TOKENS: [u8; 4] = [0x46, 0xe0, 0x4a, 0x2f];
pub const APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

pub type Word = [u8; 32];

/// Words in the `pools(uint256)` return tuple
const POOL_TUPLE_WORDS: usize = 9;

pub fn uint_word(value: Uint256) -> Word {
    value.to_be_bytes()
}

pub fn u64_word(value: u64) -> Word {
    uint_word(Uint256::from(value))
}

pub fn address_word(address: &EvmAddress) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn amount_word(amount: &Amount) -> Result<Word, ChainError> {
    amount
        .to_uint256(EVM_DECIMALS)
        .map(uint_word)
        .map_err(encoding_error)
}

pub fn encode_call(selector: [u8; 4], args: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * 32);
    data.extend_from_slice(&selector);
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

pub fn split_words(data: &[u8]) -> Result<Vec<Word>, ChainError> {
    if data.len() % 32 != 0 {
        return Err(ChainError::InvalidResponse(format!(
            "return data of {} bytes is not word aligned",
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(32)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

pub fn word_to_uint(word: &Word) -> Uint256 {
    Uint256::from_be_bytes(*word)
}

pub fn word_to_u64(word: &Word) -> Result<u64, ChainError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(ChainError::InvalidResponse(format!(
            "value 0x{} does not fit in 64 bits",
            hex::encode(word)
        )));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(low))
}

pub fn word_to_address(word: &Word) -> Result<EvmAddress, ChainError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(ChainError::InvalidResponse(format!(
            "0x{} is not an address",
            hex::encode(word)
        )));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(EvmAddress::from_bytes(bytes))
}

pub fn word_to_bool(word: &Word) -> Result<bool, ChainError> {
    match word_to_u64(word)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ChainError::InvalidResponse(format!("{other} is not a bool"))),
    }
}

fn word_to_amount(word: &Word) -> Result<Amount, ChainError> {
    Amount::from_uint256(word_to_uint(word), EVM_DECIMALS)
        .map_err(|e| ChainError::InvalidResponse(e.to_string()))
}

/// Decode the `pools(uint256)` return tuple
pub fn decode_pool(id: u64, data: &[u8]) -> Result<PoolRecord, ChainError> {
    let words = split_words(data)?;
    if words.len() < POOL_TUPLE_WORDS {
        return Err(ChainError::InvalidResponse(format!(
            "pool {id}: expected {POOL_TUPLE_WORDS} words, got {}",
            words.len()
        )));
    }

    Ok(PoolRecord {
        id,
        sale_asset: Address::Evm(word_to_address(&words[0])?),
        window_start: word_to_u64(&words[1])?,
        window_end: word_to_u64(&words[2])?,
        total_supply: word_to_amount(&words[3])?,
        unit_price: word_to_amount(&words[4])?,
        min_contribution: word_to_amount(&words[5])?,
        max_contribution: word_to_amount(&words[6])?,
        total_raised: word_to_amount(&words[7])?,
        finalized: word_to_bool(&words[8])?,
        account: None,
    })
}

/// Build the transaction for `operation` against `sale_contract`
///
/// `Approve` targets the asset's token contract with the sale contract as
/// spender; `Contribute` carries its amount as native value.
pub fn encode_operation(
    operation: &PoolOperation,
    sale_contract: &EvmAddress,
) -> Result<EvmTransaction, ChainError> {
    let call = |data: Vec<u8>| EvmTransaction {
        to: *sale_contract,
        data,
        value: Uint256::zero(),
    };

    let tx = match operation {
        PoolOperation::Approve { asset, amount } => EvmTransaction {
            to: *evm_asset(asset)?,
            data: encode_call(
                APPROVE,
                &[address_word(sale_contract), amount_word(amount)?],
            ),
            value: Uint256::zero(),
        },
        PoolOperation::CreatePool(params) => call(encode_call(
            CREATE_POOL,
            &[
                address_word(evm_asset(&params.sale_asset)?),
                u64_word(params.window_start),
                u64_word(params.window_end),
                amount_word(&params.total_supply)?,
                amount_word(&params.unit_price)?,
                amount_word(&params.min_contribution)?,
                amount_word(&params.max_contribution)?,
            ],
        )),
        PoolOperation::Contribute { pool, amount } => EvmTransaction {
            to: *sale_contract,
            data: encode_call(CONTRIBUTE, &[u64_word(pool.id)]),
            value: amount.to_uint256(EVM_DECIMALS).map_err(encoding_error)?,
        },
        PoolOperation::Finalize { pool } => call(encode_call(FINALIZE_POOL, &[u64_word(pool.id)])),
        PoolOperation::Claim { pool } => call(encode_call(CLAIM_TOKENS, &[u64_word(pool.id)])),
    };

    Ok(tx)
}

fn evm_asset(asset: &Address) -> Result<&EvmAddress, ChainError> {
    asset
        .as_evm()
        .ok_or_else(|| ChainError::EncodingError(format!("{asset} is not an EVM address")))
}

fn encoding_error(err: AmountError) -> ChainError {
    ChainError::EncodingError(err.to_string())
}
