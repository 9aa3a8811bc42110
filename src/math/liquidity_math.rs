use crate::Q96;
use crate::error::{Error, MathError};
use crate::math::math_helpers::mul_div;
use crate::math::sqrt_price_math::{get_amount_0_delta_base, get_amount_1_delta_base};
use alloy_primitives::U256;

/// Applies a signed liquidity delta.
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        x.checked_sub(y.unsigned_abs()).ok_or(MathError::Underflow)
    } else {
        x.checked_add(y as u128).ok_or(MathError::Overflow)
    }
}

fn to_liquidity(value: U256) -> Result<u128, MathError> {
    u128::try_from(value).map_err(|_| MathError::Overflow)
}

fn ordered(a: U256, b: U256) -> (U256, U256) {
    if a > b { (b, a) } else { (a, b) }
}

/// Liquidity supported by `amount0` of token0 across `[sqrt_a, sqrt_b]`,
/// rounded down.
pub fn get_liquidity_for_amount0(
    sqrt_a_x96: U256,
    sqrt_b_x96: U256,
    amount0: U256,
) -> Result<u128, MathError> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96);
    if lower == upper {
        return Err(MathError::DivisionByZero);
    }
    let intermediate = mul_div(lower, upper, Q96)?;
    to_liquidity(mul_div(amount0, intermediate, upper - lower)?)
}

/// Liquidity supported by `amount1` of token1 across `[sqrt_a, sqrt_b]`,
/// rounded down.
pub fn get_liquidity_for_amount1(
    sqrt_a_x96: U256,
    sqrt_b_x96: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96);
    to_liquidity(mul_div(amount1, Q96, upper - lower)?)
}

/// Largest liquidity the given amounts can back at the current price.
///
/// Below the range only token0 counts, above it only token1, and inside
/// it the smaller of the two is the binding side.
pub fn get_liquidity_for_amounts(
    sqrt_price_x96: U256,
    sqrt_a_x96: U256,
    sqrt_b_x96: U256,
    amount0: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96);

    if sqrt_price_x96 <= lower {
        get_liquidity_for_amount0(lower, upper, amount0)
    } else if sqrt_price_x96 < upper {
        let liquidity0 = get_liquidity_for_amount0(sqrt_price_x96, upper, amount0)?;
        let liquidity1 = get_liquidity_for_amount1(lower, sqrt_price_x96, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        get_liquidity_for_amount1(lower, upper, amount1)
    }
}

/// Token amounts represented by `liquidity` over `[sqrt_a, sqrt_b]` at the
/// current price, rounding as requested.
pub fn get_amounts_for_liquidity(
    sqrt_price_x96: U256,
    sqrt_a_x96: U256,
    sqrt_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<(U256, U256), Error> {
    let (lower, upper) = ordered(sqrt_a_x96, sqrt_b_x96);

    if sqrt_price_x96 <= lower {
        let amount0 = get_amount_0_delta_base(lower, upper, liquidity, round_up)?;
        Ok((amount0, U256::ZERO))
    } else if sqrt_price_x96 < upper {
        let amount0 = get_amount_0_delta_base(sqrt_price_x96, upper, liquidity, round_up)?;
        let amount1 = get_amount_1_delta_base(lower, sqrt_price_x96, liquidity, round_up)?;
        Ok((amount0, amount1))
    } else {
        let amount1 = get_amount_1_delta_base(lower, upper, liquidity, round_up)?;
        Ok((U256::ZERO, amount1))
    }
}
