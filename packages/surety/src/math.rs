use soroban_sdk::{Env, U256};

use crate::{RATE_DENOMINATOR, SECONDS_PER_YEAR};

/// Computes `a * b / denominator` with a 256 bit intermediate product, truncating toward zero.
///
/// Returns `None` when `denominator` is zero or when the quotient does not fit in `u128`.
pub fn mul_div(env: &Env, a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    U256::from_u128(env, a)
        .mul(&U256::from_u128(env, b))
        .div(&U256::from_u128(env, denominator))
        .to_u128()
}

/// Signed token amounts are never negative inside the pool, this keeps the conversions in one place.
pub fn mul_div_i128(env: &Env, a: i128, b: i128, denominator: i128) -> Option<i128> {
    if a < 0 || b < 0 || denominator <= 0 {
        return None;
    }
    mul_div(env, a as u128, b as u128, denominator as u128).and_then(|v| i128::try_from(v).ok())
}

/// Linear premium: `duration * annual_rate * coverage / (SECONDS_PER_YEAR * RATE_DENOMINATOR)`.
pub fn premium(
    env: &Env,
    duration: u64,
    annual_rate_bps: u32,
    coverage_amount: i128,
) -> Option<i128> {
    let rate_seconds = (duration as u128).checked_mul(annual_rate_bps as u128)?;
    mul_div_i128(
        env,
        i128::try_from(rate_seconds).ok()?,
        coverage_amount,
        (SECONDS_PER_YEAR as i128) * (RATE_DENOMINATOR as i128),
    )
}
