use crate::math::math_helpers::{div_rounding_up, mul_div, mul_div_rounding_up};
use crate::{
    Q96, RESOLUTION, U160_MAX,
    error::{Error, MathError, StateError},
};
use alloy_primitives::{I256, U256};

/// Next sqrt price after adding or removing `amount` of token0, rounded up.
///
/// Rounding up keeps the price on the side that never gives away more
/// token1 than the reserves allow.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    if amount.is_zero() {
        return Ok(sqrt_p_x96);
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let product = amount.checked_mul(sqrt_p_x96);

    if add {
        if let Some(product) = product {
            if let Some(denominator) = numerator1.checked_add(product) {
                return Ok(mul_div_rounding_up(numerator1, sqrt_p_x96, denominator)?);
            }
        }
        // L / (L / sqrtP + amount), rearranged to avoid the overflowing product.
        let denominator = (numerator1 / sqrt_p_x96)
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        Ok(div_rounding_up(numerator1, denominator)?)
    } else {
        match product {
            Some(product) if numerator1 > product => {
                Ok(mul_div_rounding_up(numerator1, sqrt_p_x96, numerator1 - product)?)
            }
            _ => Err(StateError::InsufficientReserves.into()),
        }
    }
}

/// Next sqrt price after adding or removing `amount` of token1, rounded down.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    let liquidity = U256::from(liquidity);

    let result = if add {
        let quotient = if amount <= U160_MAX {
            (amount << RESOLUTION) / liquidity
        } else {
            mul_div(amount, Q96, liquidity)?
        };
        sqrt_p_x96
            .checked_add(quotient)
            .ok_or(MathError::Overflow)?
    } else {
        let quotient = if amount <= U160_MAX {
            div_rounding_up(amount << RESOLUTION, liquidity)?
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };
        if sqrt_p_x96 <= quotient {
            return Err(StateError::InsufficientReserves.into());
        }
        sqrt_p_x96 - quotient
    };

    if result > U160_MAX {
        return Err(MathError::Overflow.into());
    }
    Ok(result)
}

/// Unsigned token0 amount between two sqrt prices for `liquidity`.
///
/// The bounds may be given in either order.
pub fn get_amount_0_delta_base(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, Error> {
    let (lower, upper) = ordered(sqrt_ratio_a_x96, sqrt_ratio_b_x96);

    if lower.is_zero() {
        return Err(StateError::SqrtRatioIsZero.into());
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = upper - lower;

    let amount = if round_up {
        div_rounding_up(mul_div_rounding_up(numerator1, numerator2, upper)?, lower)?
    } else {
        mul_div(numerator1, numerator2, upper)? / lower
    };
    Ok(amount)
}

/// Unsigned token1 amount between two sqrt prices for `liquidity`.
///
/// The bounds may be given in either order.
pub fn get_amount_1_delta_base(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    let (lower, upper) = ordered(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, upper - lower, Q96)
    } else {
        mul_div(liquidity, upper - lower, Q96)
    }
}

/// Signed token0 delta for a signed liquidity change.
///
/// Adding liquidity rounds up (what the pool is owed), removing rounds
/// down (what the pool pays out).
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, Error> {
    let magnitude = liquidity.unsigned_abs();
    let amount = get_amount_0_delta_base(
        sqrt_ratio_a_x96,
        sqrt_ratio_b_x96,
        magnitude,
        liquidity >= 0,
    )?;
    Ok(signed(amount, liquidity < 0))
}

/// Signed token1 delta for a signed liquidity change.
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, MathError> {
    let magnitude = liquidity.unsigned_abs();
    let amount = get_amount_1_delta_base(
        sqrt_ratio_a_x96,
        sqrt_ratio_b_x96,
        magnitude,
        liquidity >= 0,
    )?;
    Ok(signed(amount, liquidity < 0))
}

/// Next sqrt price when `amount_in` enters the pool.
pub fn get_next_sqrt_price_from_input(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    check_price_and_liquidity(sqrt_p_x96, liquidity)?;

    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_in, true)
    }
}

/// Next sqrt price when `amount_out` leaves the pool.
pub fn get_next_sqrt_price_from_output(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    check_price_and_liquidity(sqrt_p_x96, liquidity)?;

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_out, false)
    }
}

#[inline]
fn ordered(a: U256, b: U256) -> (U256, U256) {
    if a > b { (b, a) } else { (a, b) }
}

#[inline]
fn signed(amount: U256, negative: bool) -> I256 {
    let value = I256::from_raw(amount);
    if negative { -value } else { value }
}

fn check_price_and_liquidity(sqrt_p_x96: U256, liquidity: u128) -> Result<(), StateError> {
    if sqrt_p_x96.is_zero() {
        return Err(StateError::SqrtPriceIsZero);
    }
    if liquidity == 0 {
        return Err(StateError::LiquidityIsZero);
    }
    Ok(())
}
