//! Conversion between human decimal strings and on-chain fixed-point integers.

use crate::errors::SwapError;
use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use std::str::FromStr;

/// Parse `amount` (e.g. `"1.5"`) into smallest units at `decimals` precision.
///
/// Rejects negative values, exponents, more fractional digits than the token
/// supports, and values that do not fit in 256 bits.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, SwapError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(SwapError::InvalidAmount("empty amount".into()));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(SwapError::InvalidAmount(format!("not a decimal number: {trimmed}")));
    }
    let value = BigDecimal::from_str(trimmed)
        .map_err(|e| SwapError::InvalidAmount(format!("{trimmed}: {e}")))?;

    let (digits, scale) = value.normalized().as_bigint_and_exponent();
    if scale > decimals as i64 {
        return Err(SwapError::InvalidAmount(format!(
            "{trimmed} has more than {decimals} decimal places"
        )));
    }
    let shift = (decimals as i64 - scale) as u32;
    let units = digits * BigInt::from(10u8).pow(shift);
    bigint_to_u256(&units)
        .ok_or_else(|| SwapError::InvalidAmount(format!("{trimmed} overflows uint256")))
}

/// Render smallest-unit `amount` as a decimal string with trailing zeros trimmed.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let raw = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return raw;
    }
    let padded = if raw.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - raw.len() + 1), raw)
    } else {
        raw
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac}")
    }
}

fn bigint_to_u256(value: &BigInt) -> Option<U256> {
    if value.is_zero() {
        return Some(U256::zero());
    }
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus || bytes.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(&bytes))
}
