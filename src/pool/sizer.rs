use crate::env::Slot0;
use crate::error::Error;
use crate::math::liquidity_math::{
    get_amounts_for_liquidity, get_liquidity_for_amount0, get_liquidity_for_amount1,
};
use crate::math::tick_math::{MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick};
use alloy_primitives::U256;

/// Liquidity a deposit backs and the base-unit amounts it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSize {
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

fn check_range(lower_tick: i32, upper_tick: i32, tick_spacing: i32) -> Result<(), Error> {
    for tick in [lower_tick, upper_tick] {
        if !(MIN_TICK..=MAX_TICK).contains(&tick) || tick % tick_spacing != 0 {
            return Err(Error::TickBoundsError(tick));
        }
    }
    if lower_tick >= upper_tick {
        return Err(Error::InvalidRangeError {
            lower: lower_tick as f64,
            upper: upper_tick as f64,
        });
    }
    Ok(())
}

/// Sizes a deposit of at most `desired0`/`desired1` over
/// `[lower_tick, upper_tick)` at the current pool price.
///
/// Below the range only token0 is used, above it only token1, and inside
/// it the side that supports less liquidity binds. Liquidity rounds down
/// and the consumed amounts round up, matching what the pool charges, so
/// neither amount exceeds what was offered.
pub fn size_position(
    desired0: U256,
    desired1: U256,
    lower_tick: i32,
    upper_tick: i32,
    tick_spacing: i32,
    current: Slot0,
) -> Result<PositionSize, Error> {
    check_range(lower_tick, upper_tick, tick_spacing)?;

    let sqrt_lower = get_sqrt_ratio_at_tick(lower_tick)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(upper_tick)?;
    let sqrt_price = current.sqrt_price_x96;

    let below = current.tick < lower_tick || sqrt_price <= sqrt_lower;
    let above = current.tick >= upper_tick || sqrt_price >= sqrt_upper;

    let liquidity = if below {
        if desired0.is_zero() {
            return Err(Error::InsufficientAmountError { side: "token0" });
        }
        get_liquidity_for_amount0(sqrt_lower, sqrt_upper, desired0)?
    } else if above {
        if desired1.is_zero() {
            return Err(Error::InsufficientAmountError { side: "token1" });
        }
        get_liquidity_for_amount1(sqrt_lower, sqrt_upper, desired1)?
    } else {
        if desired0.is_zero() {
            return Err(Error::InsufficientAmountError { side: "token0" });
        }
        if desired1.is_zero() {
            return Err(Error::InsufficientAmountError { side: "token1" });
        }
        let liquidity0 = get_liquidity_for_amount0(sqrt_price, sqrt_upper, desired0)?;
        let liquidity1 = get_liquidity_for_amount1(sqrt_lower, sqrt_price, desired1)?;
        liquidity0.min(liquidity1)
    };

    if liquidity == 0 {
        let side = if below {
            "token0"
        } else if above {
            "token1"
        } else {
            "token0 and token1"
        };
        return Err(Error::InsufficientAmountError { side });
    }

    let (amount0, amount1) =
        get_amounts_for_liquidity(sqrt_price, sqrt_lower, sqrt_upper, liquidity, true)?;

    Ok(PositionSize {
        liquidity,
        amount0: amount0.min(desired0),
        amount1: amount1.min(desired1),
    })
}

/// Token amounts a position holds at the current price, rounded down.
pub fn position_amounts(
    liquidity: u128,
    lower_tick: i32,
    upper_tick: i32,
    current: Slot0,
) -> Result<(U256, U256), Error> {
    if lower_tick >= upper_tick {
        return Err(Error::InvalidRangeError {
            lower: lower_tick as f64,
            upper: upper_tick as f64,
        });
    }
    let sqrt_lower =
        get_sqrt_ratio_at_tick(lower_tick).map_err(|_| Error::TickBoundsError(lower_tick))?;
    let sqrt_upper =
        get_sqrt_ratio_at_tick(upper_tick).map_err(|_| Error::TickBoundsError(upper_tick))?;
    get_amounts_for_liquidity(current.sqrt_price_x96, sqrt_lower, sqrt_upper, liquidity, false)
}
