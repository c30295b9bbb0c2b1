//! ABI parameter access
//!
//! Treats a payload as a 4-byte selector followed by 32-byte words. Used to
//! zero a minimum-output style parameter before the batch starts.

use ethers::types::{Bytes, U256};
use thiserror::Error;

const SELECTOR_LEN: usize = 4;
const WORD_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalldataError {
    #[error("payload is not valid hex")]
    InvalidHex,

    #[error("payload of {0} bytes has no function selector")]
    MissingSelector(usize),

    #[error("parameter area of {0} bytes is not a whole number of words")]
    Misaligned(usize),

    #[error("parameter {index} out of range ({count} parameters)")]
    OutOfRange { index: usize, count: usize },
}

/// Parses a hex payload, with or without `0x`
pub fn decode_payload(value: &str) -> Result<Bytes, CalldataError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map(Bytes::from).map_err(|_| CalldataError::InvalidHex)
}

fn words(payload: &[u8]) -> Result<&[u8], CalldataError> {
    if payload.len() < SELECTOR_LEN {
        return Err(CalldataError::MissingSelector(payload.len()));
    }
    let params = &payload[SELECTOR_LEN..];
    if params.len() % WORD_LEN != 0 {
        return Err(CalldataError::Misaligned(params.len()));
    }
    Ok(params)
}

pub fn parameter_count(payload: &[u8]) -> Result<usize, CalldataError> {
    Ok(words(payload)?.len() / WORD_LEN)
}

/// Reads parameter word `index`
pub fn parameter(payload: &[u8], index: usize) -> Result<U256, CalldataError> {
    let params = words(payload)?;
    let count = params.len() / WORD_LEN;
    if index >= count {
        return Err(CalldataError::OutOfRange { index, count });
    }
    Ok(U256::from_big_endian(&params[index * WORD_LEN..(index + 1) * WORD_LEN]))
}

/// Returns a copy of `payload` with parameter word `index` set to `value`
pub fn patch_parameter(payload: &[u8], index: usize, value: U256) -> Result<Bytes, CalldataError> {
    let count = parameter_count(payload)?;
    if index >= count {
        return Err(CalldataError::OutOfRange { index, count });
    }

    let mut out = payload.to_vec();
    let start = SELECTOR_LEN + index * WORD_LEN;
    value.to_big_endian(&mut out[start..start + WORD_LEN]);
    Ok(Bytes::from(out))
}

/// Index of the last parameter word that is not zero
///
/// Swap-style calls usually put the minimum output amount last, so this is
/// the candidate zeroed by `auto_zero_min_amount`.
pub fn last_nonzero_parameter(payload: &[u8]) -> Result<Option<usize>, CalldataError> {
    let params = words(payload)?;
    Ok(params
        .chunks(WORD_LEN)
        .rposition(|word| word.iter().any(|b| *b != 0)))
}
