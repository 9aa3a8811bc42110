//! Human prices, Q64.96 sqrt prices and tick indices.
//!
//! Prices here are always token1 per token0. [`PriceScale`] moves between
//! prices quoted in whole tokens and the raw base-unit ratio the pool
//! contract works in.

use crate::catalog::Token;
use crate::error::Error;
use crate::math::math_helpers::{f64_to_u256, u256_to_f64};
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use alloy_primitives::U256;

const Q96_F64: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// Direction used when snapping a tick onto the spacing grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward negative infinity; used for lower bounds.
    Down,
    /// Toward positive infinity; used for upper bounds.
    Up,
}

fn approximate_tick(price: f64) -> i32 {
    (price.ln() / 1.0001f64.ln()).floor() as i32
}

/// `floor(sqrt(price) * 2^96)`.
pub fn price_to_sqrt_price_x96(price: f64) -> Result<U256, Error> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPriceError(price));
    }
    match f64_to_u256(price.sqrt() * Q96_F64) {
        Some(sqrt) if (MIN_SQRT_RATIO..MAX_SQRT_RATIO).contains(&sqrt) => Ok(sqrt),
        _ => Err(Error::TickBoundsError(approximate_tick(price))),
    }
}

pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256) -> f64 {
    let sqrt = u256_to_f64(sqrt_price_x96) / Q96_F64;
    sqrt * sqrt
}

/// Snaps `tick` to a multiple of `tick_spacing` in the given direction.
pub fn align_tick(tick: i32, tick_spacing: i32, rounding: Rounding) -> i32 {
    match rounding {
        Rounding::Down => tick.div_euclid(tick_spacing) * tick_spacing,
        Rounding::Up => -((-tick).div_euclid(tick_spacing)) * tick_spacing,
    }
}

/// Tick for `price` aligned to the spacing.
///
/// `Rounding::Down` never returns a tick priced above `price`, and
/// `Rounding::Up` never one priced below it, so a range aligned with
/// `Down` on its lower bound and `Up` on its upper bound never shrinks.
pub fn price_to_tick(price: f64, tick_spacing: i32, rounding: Rounding) -> Result<i32, Error> {
    let sqrt = price_to_sqrt_price_x96(price)?;
    let mut tick = get_tick_at_sqrt_ratio(sqrt)?;

    if rounding == Rounding::Up && get_sqrt_ratio_at_tick(tick)? != sqrt {
        tick += 1;
    }

    let aligned = align_tick(tick, tick_spacing, rounding);
    if !(MIN_TICK..=MAX_TICK).contains(&aligned) {
        return Err(Error::TickBoundsError(aligned));
    }
    Ok(aligned)
}

pub fn tick_to_price(tick: i32) -> Result<f64, Error> {
    let sqrt = get_sqrt_ratio_at_tick(tick).map_err(|_| Error::TickBoundsError(tick))?;
    Ok(sqrt_price_x96_to_price(sqrt))
}

/// Aligned `(lower, upper)` ticks covering `[lower_price, upper_price]`.
pub fn price_range_to_ticks(
    lower_price: f64,
    upper_price: f64,
    tick_spacing: i32,
) -> Result<(i32, i32), Error> {
    if lower_price.is_nan() || upper_price.is_nan() || lower_price >= upper_price {
        return Err(Error::InvalidRangeError {
            lower: lower_price,
            upper: upper_price,
        });
    }
    let lower = price_to_tick(lower_price, tick_spacing, Rounding::Down)?;
    let upper = price_to_tick(upper_price, tick_spacing, Rounding::Up)?;
    Ok((lower, upper))
}

/// Lowest tick a position may use at this spacing.
pub fn min_usable_tick(tick_spacing: i32) -> i32 {
    align_tick(MIN_TICK, tick_spacing, Rounding::Up)
}

/// Highest tick a position may use at this spacing.
pub fn max_usable_tick(tick_spacing: i32) -> i32 {
    align_tick(MAX_TICK, tick_spacing, Rounding::Down)
}

/// Converts prices between whole-token and base-unit terms for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceScale {
    pub decimals0: u8,
    pub decimals1: u8,
}

impl PriceScale {
    pub fn new(token0: &Token, token1: &Token) -> Self {
        Self {
            decimals0: token0.decimals,
            decimals1: token1.decimals,
        }
    }

    fn factor(&self) -> f64 {
        10f64.powi(self.decimals1 as i32 - self.decimals0 as i32)
    }

    /// Whole-token price to the raw base-unit ratio.
    pub fn to_raw(&self, human_price: f64) -> f64 {
        human_price * self.factor()
    }

    /// Raw base-unit ratio to a whole-token price.
    pub fn to_human(&self, raw_price: f64) -> f64 {
        raw_price / self.factor()
    }
}
