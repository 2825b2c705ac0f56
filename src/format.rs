//! Amount formatting shared by the tools.
//!
//! Token amounts are 256-bit unsigned integers and are only ever divided as
//! integers. USD figures arrive as JSON numbers and go through `Decimal`.

use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Renders with exactly two fractional digits, rounding half away from zero.
pub fn fixed2(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// `10^exp`, or `None` when it does not fit in 256 bits.
pub fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}

/// Whole units of `raw / 10^decimals`, truncated.
pub fn whole_units(raw: U256, decimals: u32) -> Option<U256> {
    Some(raw / pow10(decimals)?)
}

/// `raw / 10^decimals` with two fractional digits, rounding half up.
pub fn units_fixed2(raw: U256, decimals: u32) -> Option<String> {
    let scale = pow10(decimals)?;
    let hundred = U256::from(100u64);
    let cents = raw
        .checked_mul(hundred)?
        .checked_add(scale / U256::from(2u64))?
        / scale;
    let whole = cents / hundred;
    let frac = cents % hundred;
    Some(format!("{whole}.{:0>2}", frac.to_string()))
}

pub fn parse_u256(raw: &str) -> Option<U256> {
    U256::from_str_radix(raw.trim(), 10).ok()
}

pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
