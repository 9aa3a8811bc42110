use crate::FastMap;
use crate::catalog::FeeTier;
use crate::env::Slot0;
use crate::error::{Error, MathError, StateError};
use crate::math::liquidity_math::add_delta;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::tick_bitmap::{TickBitmap, flip_tick};
use crate::math::tick_math::{MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio};
use alloy_primitives::{Address, I256, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickInfo {
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
}

/// State of one concentrated liquidity pool.
///
/// Only initialized ticks are stored; a tick whose gross liquidity drops
/// to zero is removed and its bitmap bit cleared.
#[derive(Clone, Debug)]
pub struct V3Pool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub slot0: Slot0,
    pub liquidity: u128,
    pub bitmap: TickBitmap,
    pub ticks: FastMap<i32, TickInfo>,
}

impl V3Pool {
    pub fn new(address: Address, token0: Address, token1: Address, fee: FeeTier) -> Self {
        let (token0, token1) = if token0 < token1 {
            (token0, token1)
        } else {
            (token1, token0)
        };

        Self {
            address,
            token0,
            token1,
            fee_pips: fee.fee(),
            tick_spacing: fee.tick_spacing(),
            slot0: Slot0::default(),
            liquidity: 0,
            bitmap: TickBitmap::default(),
            ticks: FastMap::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot0.is_initialized()
    }

    /// Sets the starting price. Returns `false` if a price was already set.
    pub fn initialize(&mut self, sqrt_price_x96: U256) -> Result<bool, Error> {
        if self.is_initialized() {
            return Ok(false);
        }
        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        self.slot0 = Slot0 {
            sqrt_price_x96,
            tick,
        };
        Ok(true)
    }

    /// Returns the net liquidity delta at a given tick, if it is initialized.
    pub fn get_liquidity_net(&self, tick: &i32) -> Option<i128> {
        self.ticks.get(tick).map(|info| info.liquidity_net)
    }

    pub fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> Result<(), StateError> {
        if tick_lower >= tick_upper
            || tick_lower < MIN_TICK
            || tick_upper > MAX_TICK
            || tick_lower % self.tick_spacing != 0
            || tick_upper % self.tick_spacing != 0
        {
            return Err(StateError::TickOutOfBounds);
        }
        Ok(())
    }

    fn updated_tick(&self, tick: i32, liquidity_delta: i128, upper: bool) -> Result<TickInfo, Error> {
        let current = self.ticks.get(&tick).copied().unwrap_or_default();
        let liquidity_gross = add_delta(current.liquidity_gross, liquidity_delta)?;
        // crossing left to right adds net at the lower tick and removes it at the upper
        let liquidity_net = if upper {
            current.liquidity_net.checked_sub(liquidity_delta)
        } else {
            current.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or(MathError::Overflow)?;

        Ok(TickInfo {
            liquidity_gross,
            liquidity_net,
        })
    }

    fn write_tick(&mut self, tick: i32, info: TickInfo) -> Result<(), Error> {
        let was_initialized = self.ticks.contains_key(&tick);
        let is_initialized = info.liquidity_gross != 0;

        if was_initialized != is_initialized {
            flip_tick(&mut self.bitmap, tick, self.tick_spacing)?;
        }
        if is_initialized {
            self.ticks.insert(tick, info);
        } else {
            self.ticks.remove(&tick);
        }
        Ok(())
    }

    /// Adds (`liquidity_delta > 0`) or removes liquidity over
    /// `[tick_lower, tick_upper)`.
    ///
    /// Returns the signed token amounts owed to the pool: positive when the
    /// pool must receive tokens, negative when it releases them. Nothing is
    /// written unless every step succeeds.
    pub fn modify_position(
        &mut self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(I256, I256), Error> {
        self.check_ticks(tick_lower, tick_upper)?;
        if !self.is_initialized() {
            return Err(StateError::SqrtPriceIsZero.into());
        }

        let lower = self.updated_tick(tick_lower, liquidity_delta, false)?;
        let upper = self.updated_tick(tick_upper, liquidity_delta, true)?;

        let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;
        let Slot0 {
            sqrt_price_x96,
            tick,
        } = self.slot0;

        let mut liquidity = self.liquidity;
        let (amount0, amount1) = if tick < tick_lower {
            (
                get_amount_0_delta(sqrt_lower, sqrt_upper, liquidity_delta)?,
                I256::ZERO,
            )
        } else if tick < tick_upper {
            liquidity = add_delta(liquidity, liquidity_delta)?;
            (
                get_amount_0_delta(sqrt_price_x96, sqrt_upper, liquidity_delta)?,
                get_amount_1_delta(sqrt_lower, sqrt_price_x96, liquidity_delta)?,
            )
        } else {
            (
                I256::ZERO,
                get_amount_1_delta(sqrt_lower, sqrt_upper, liquidity_delta)?,
            )
        };

        self.write_tick(tick_lower, lower)?;
        self.write_tick(tick_upper, upper)?;
        self.liquidity = liquidity;

        Ok((amount0, amount1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_bitmap::next_initialized_tick_within_one_word;
    use alloy_primitives::address;

    fn pool_at_tick(tick: i32) -> V3Pool {
        let mut pool = V3Pool::new(
            address!("0x1000000000000000000000000000000000000000"),
            address!("0x0000000000000000000000000000000000000002"),
            address!("0x0000000000000000000000000000000000000001"),
            FeeTier::Medium,
        );
        pool.initialize(get_sqrt_ratio_at_tick(tick).unwrap()).unwrap();
        pool
    }

    #[test]
    fn new_sorts_tokens_and_takes_spacing_from_tier() {
        let pool = pool_at_tick(0);
        assert_eq!(pool.token0, address!("0x0000000000000000000000000000000000000001"));
        assert_eq!(pool.token1, address!("0x0000000000000000000000000000000000000002"));
        assert_eq!(pool.fee_pips, 3000);
        assert_eq!(pool.tick_spacing, 60);
        assert_eq!(pool.liquidity, 0);
        assert!(pool.bitmap.is_empty());
    }

    #[test]
    fn initialize_only_once() {
        let mut pool = pool_at_tick(120);
        assert_eq!(pool.slot0.tick, 120);
        assert!(!pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap());
        assert_eq!(pool.slot0.tick, 120);
    }

    #[test]
    fn in_range_position_takes_both_tokens_and_activates() {
        let mut pool = pool_at_tick(0);
        let (amount0, amount1) = pool.modify_position(-600, 600, 1_000_000_000).unwrap();

        assert!(amount0.is_positive());
        assert!(amount1.is_positive());
        assert_eq!(pool.liquidity, 1_000_000_000);
        assert_eq!(pool.get_liquidity_net(&-600), Some(1_000_000_000));
        assert_eq!(pool.get_liquidity_net(&600), Some(-1_000_000_000));

        let (next, initialized) =
            next_initialized_tick_within_one_word(&pool.bitmap, 0, 60, false).unwrap();
        assert_eq!((next, initialized), (600, true));
    }

    #[test]
    fn out_of_range_positions_are_single_sided() {
        let mut pool = pool_at_tick(0);

        let (amount0, amount1) = pool.modify_position(60, 600, 1_000_000).unwrap();
        assert!(amount0.is_positive());
        assert_eq!(amount1, I256::ZERO);

        let (amount0, amount1) = pool.modify_position(-600, -60, 1_000_000).unwrap();
        assert_eq!(amount0, I256::ZERO);
        assert!(amount1.is_positive());

        assert_eq!(pool.liquidity, 0);
    }

    #[test]
    fn removing_all_liquidity_clears_ticks_and_bitmap() {
        let mut pool = pool_at_tick(0);
        let (in0, in1) = pool.modify_position(-120, 120, 5_000_000).unwrap();
        let (out0, out1) = pool.modify_position(-120, 120, -5_000_000).unwrap();

        // removal rounds down, addition rounds up
        assert!(out0.is_negative() && out0.unsigned_abs() <= in0.unsigned_abs());
        assert!(out1.is_negative() && out1.unsigned_abs() <= in1.unsigned_abs());
        assert!(pool.ticks.is_empty());
        assert!(pool.bitmap.is_empty());
        assert_eq!(pool.liquidity, 0);
    }

    #[test]
    fn shared_ticks_stay_initialized_until_last_position_leaves() {
        let mut pool = pool_at_tick(0);
        pool.modify_position(-120, 120, 100).unwrap();
        pool.modify_position(-120, 240, 50).unwrap();
        pool.modify_position(-120, 120, -100).unwrap();

        assert_eq!(
            pool.ticks.get(&-120),
            Some(&TickInfo {
                liquidity_gross: 50,
                liquidity_net: 50
            })
        );
        assert!(!pool.ticks.contains_key(&120));
        assert_eq!(pool.liquidity, 50);
    }

    #[test]
    fn rejects_bad_ticks_without_writing() {
        let mut pool = pool_at_tick(0);
        for (lower, upper) in [(60, 60), (120, 60), (-50, 60), (MIN_TICK, 60)] {
            assert!(matches!(
                pool.modify_position(lower, upper, 10),
                Err(Error::StateError(StateError::TickOutOfBounds))
            ));
        }
        assert!(matches!(
            pool.modify_position(-60, 60, -10),
            Err(Error::MathError(_))
        ));
        assert!(pool.ticks.is_empty());
    }

    #[test]
    fn uninitialized_pool_rejects_positions() {
        let mut pool = V3Pool::new(Address::ZERO, Address::ZERO, Address::ZERO, FeeTier::Low);
        assert!(matches!(
            pool.modify_position(-10, 10, 1),
            Err(Error::StateError(StateError::SqrtPriceIsZero))
        ));
    }
}
