//! Canned liquidity placements built on [`PoolHandle`].

use crate::env::ContractEnv;
use crate::error::Error;
use crate::math::price_tick::{max_usable_tick, min_usable_tick};
use crate::pool::handle::{MintedPosition, PoolHandle};
use alloy_primitives::Address;

/// Half-width of [`tight_band_liquidity`]'s range, relative to its centre.
pub const DEFAULT_BAND: f64 = 0.05;

/// Spreads the deposit over every usable tick of the pool.
pub fn full_range_liquidity<E: ContractEnv>(
    pool: &PoolHandle<E>,
    amount0: f64,
    amount1: f64,
    account: Address,
) -> Result<MintedPosition, Error> {
    let spacing = pool.tick_spacing();
    pool.mint_position_with_ticks(
        amount0,
        amount1,
        min_usable_tick(spacing),
        max_usable_tick(spacing),
        account,
    )
}

/// Concentrates the deposit within `band` of `price_point` (token1 per
/// token0) on either side.
pub fn tight_band_liquidity<E: ContractEnv>(
    pool: &PoolHandle<E>,
    price_point: f64,
    amount0: f64,
    amount1: f64,
    account: Address,
    band: f64,
) -> Result<MintedPosition, Error> {
    if !(band > 0.0 && band < 1.0) {
        return Err(Error::InvalidFractionError(band));
    }
    if !price_point.is_finite() || price_point <= 0.0 {
        return Err(Error::InvalidPriceError(price_point));
    }
    pool.mint_liquidity_position(
        amount0,
        amount1,
        price_point * (1.0 - band),
        price_point * (1.0 + band),
        account,
    )
}
