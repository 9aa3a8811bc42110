use crate::env::Slot0;
use crate::error::{Error, SwapError};
use crate::math::liquidity_math::add_delta;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_bitmap::next_initialized_tick_within_one_word;
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::sim::v3_pool::V3Pool;
use alloy_primitives::{I256, U256};

/// Most permissive limit for a swap direction: one step inside the
/// protocol bounds.
pub fn default_sqrt_price_limit(zero_for_one: bool) -> U256 {
    if zero_for_one {
        MIN_SQRT_RATIO + U256::ONE
    } else {
        MAX_SQRT_RATIO - U256::ONE
    }
}

/// Swap request against a [`V3Pool`].
///
/// A positive `amount_specified` is an exact input, a negative one an
/// exact output. The price never crosses `sqrt_price_limit_x96`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapParams {
    pub zero_for_one: bool,
    pub amount_specified: I256,
    pub sqrt_price_limit_x96: U256,
}

impl SwapParams {
    #[inline]
    pub fn new(zero_for_one: bool, amount_specified: I256, sqrt_price_limit_x96: U256) -> Self {
        Self {
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        }
    }
}

/// Outcome of a swap and the pool state it leaves behind.
///
/// Deltas are from the pool's side: positive amounts flow into the pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapResult {
    pub amount0_delta: I256,
    pub amount1_delta: I256,
    pub fees_paid: U256,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub liquidity: u128,
}

// Running totals, written back to the pool by `apply_swap`.
#[derive(Default)]
struct SwapState {
    // specified side still to fill
    amount_specified_remaining: I256,
    // other side, accumulated
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    swap_fee: U256,
}

#[derive(Default)]
struct StepComputations {
    sqrt_price_start_x96: U256,
    // boundary of this step: an initialized tick or a bitmap word edge
    tick_next: i32,
    initialized: bool,
    sqrt_price_next_x96: U256,
}

impl V3Pool {
    /// Runs the swap loop against the current state without writing it.
    ///
    /// Ranges without liquidity are crossed for free, so a swap into an
    /// empty side of the book moves the price all the way to the limit.
    pub fn swap(&self, params: SwapParams) -> Result<SwapResult, Error> {
        let amount_specified = params.amount_specified;
        if amount_specified.is_zero() {
            return Err(SwapError::AmountSpecifiedIsZero.into());
        }

        let zero_for_one = params.zero_for_one;
        let sqrt_price_limit_x96 = params.sqrt_price_limit_x96;
        let out_of_bounds = if zero_for_one {
            sqrt_price_limit_x96 >= self.slot0.sqrt_price_x96
                || sqrt_price_limit_x96 <= MIN_SQRT_RATIO
        } else {
            sqrt_price_limit_x96 <= self.slot0.sqrt_price_x96
                || sqrt_price_limit_x96 >= MAX_SQRT_RATIO
        };
        if out_of_bounds {
            return Err(SwapError::SqrtPriceOutOfBounds.into());
        }

        let exact_input = amount_specified.is_positive();

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: self.slot0.sqrt_price_x96,
            tick: self.slot0.tick,
            liquidity: self.liquidity,
            swap_fee: U256::ZERO,
        };

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..Default::default()
            };

            (step.tick_next, step.initialized) = next_initialized_tick_within_one_word(
                &self.bitmap,
                state.tick,
                self.tick_spacing,
                zero_for_one,
            )?;
            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);
            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            let target = if zero_for_one {
                step.sqrt_price_next_x96.max(sqrt_price_limit_x96)
            } else {
                step.sqrt_price_next_x96.min(sqrt_price_limit_x96)
            };

            let computed = compute_swap_step(
                state.sqrt_price_x96,
                target,
                state.liquidity,
                state.amount_specified_remaining,
                self.fee_pips,
            )?;
            state.sqrt_price_x96 = computed.sqrt_price_next_x96;
            state.swap_fee += computed.fee_amount;

            if exact_input {
                state.amount_specified_remaining -=
                    I256::from_raw(computed.amount_in + computed.fee_amount);
                state.amount_calculated -= I256::from_raw(computed.amount_out);
            } else {
                state.amount_specified_remaining += I256::from_raw(computed.amount_out);
                state.amount_calculated +=
                    I256::from_raw(computed.amount_in + computed.fee_amount);
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let mut liquidity_net = self
                        .get_liquidity_net(&step.tick_next)
                        .ok_or(SwapError::LiquidityIsZero)?;
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let specified_used = amount_specified - state.amount_specified_remaining;
        let (amount0_delta, amount1_delta) = if zero_for_one == exact_input {
            (specified_used, state.amount_calculated)
        } else {
            (state.amount_calculated, specified_used)
        };

        Ok(SwapResult {
            amount0_delta,
            amount1_delta,
            fees_paid: state.swap_fee,
            sqrt_price_x96: state.sqrt_price_x96,
            tick: state.tick,
            liquidity: state.liquidity,
        })
    }

    /// Writes the price, tick and in-range liquidity a swap ended at.
    pub fn apply_swap(&mut self, result: &SwapResult) {
        self.slot0 = Slot0 {
            sqrt_price_x96: result.sqrt_price_x96,
            tick: result.tick,
        };
        self.liquidity = result.liquidity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FeeTier;
    use crate::math::tick_bitmap::TickBitmap;
    use crate::sim::v3_pool::TickInfo;
    use alloy_primitives::address;
    use std::str::FromStr;

    fn spacing_one_pool(
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
        bitmap: TickBitmap,
    ) -> V3Pool {
        let pool_address = address!("0x1000000000000000000000000000000000000000");
        let token0 = address!("0x0000000000000000000000000000000000000001");
        let token1 = address!("0x0000000000000000000000000000000000000002");

        let mut pool = V3Pool::new(pool_address, token0, token1, FeeTier::Medium);
        pool.slot0 = Slot0 {
            sqrt_price_x96,
            tick,
        };
        pool.liquidity = liquidity;
        pool.tick_spacing = 1;
        pool.bitmap = bitmap;
        pool
    }

    fn exact_in(amount: u64) -> I256 {
        I256::from_raw(U256::from(amount))
    }

    #[test]
    fn zero_amount_is_rejected() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let pool = spacing_one_pool(sqrt_price, 0, 1_000_000u128, TickBitmap::default());

        let params = SwapParams::new(true, I256::ZERO, sqrt_price - U256::ONE);
        assert!(matches!(
            pool.swap(params),
            Err(Error::SwapError(SwapError::AmountSpecifiedIsZero))
        ));
    }

    #[test]
    fn swap_rejects_limits_on_the_wrong_side() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let pool = spacing_one_pool(sqrt_price, 0, 1_000_000u128, TickBitmap::default());

        for (zero_for_one, limit) in [
            (true, sqrt_price),
            (true, MIN_SQRT_RATIO),
            (false, sqrt_price),
            (false, MAX_SQRT_RATIO),
        ] {
            let params = SwapParams::new(zero_for_one, exact_in(1_000), limit);
            assert!(matches!(
                pool.swap(params),
                Err(Error::SwapError(SwapError::SqrtPriceOutOfBounds))
            ));
        }
    }

    #[test]
    fn empty_pool_moves_to_limit_without_exchanging() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let pool = spacing_one_pool(sqrt_price, 0, 0u128, TickBitmap::default());

        let limit = sqrt_price - U256::ONE;
        let result = pool
            .swap(SwapParams::new(true, exact_in(1_000_000), limit))
            .unwrap();

        assert_eq!(result.amount0_delta, I256::ZERO);
        assert_eq!(result.amount1_delta, I256::ZERO);
        assert_eq!(result.fees_paid, U256::ZERO);
        assert_eq!(result.sqrt_price_x96, limit);
    }

    #[test]
    fn one_for_zero_deltas_have_pool_side_signs() {
        let sqrt_price = get_sqrt_ratio_at_tick(0).unwrap();
        let mut bitmap = TickBitmap::default();
        bitmap.insert(0_i16, U256::from(1u8));

        let pool = spacing_one_pool(sqrt_price, 0, 1_000_000u128, bitmap);

        let limit = sqrt_price * U256::from(2u8);
        assert!(limit < MAX_SQRT_RATIO);

        let amount = U256::from_str("1000000000000000000").unwrap();
        let result = pool
            .swap(SwapParams::new(false, I256::from_raw(amount), limit))
            .unwrap();

        assert!(result.amount1_delta > I256::ZERO);
        assert!(result.amount0_delta < I256::ZERO);
        assert!(result.fees_paid > U256::ZERO);
        assert_eq!(result.sqrt_price_x96, limit);
    }

    fn mainnet_usdc_weth_pool() -> V3Pool {
        let mut pool = spacing_one_pool(U256::ZERO, 0, 0, TickBitmap::default());

        pool.slot0 = Slot0 {
            sqrt_price_x96: U256::from_str("1046706758115479018135889").unwrap(),
            tick: -224701,
        };
        pool.liquidity = 203624297715738503472u128;
        pool.tick_spacing = 60;

        pool.bitmap.insert(
            -15_i16,
            U256::from_str("39614081257132168796771975168").unwrap(),
        );
        pool.bitmap.insert(
            57_i16,
            U256::from_str("50216813883093446110686315385661331328818843555712276103168").unwrap(),
        );

        pool.ticks.insert(
            -224700,
            TickInfo {
                liquidity_gross: 203624287356963452704,
                liquidity_net: -203624287356963452704,
            },
        );
        pool.ticks.insert(
            887220,
            TickInfo {
                liquidity_gross: 10358775050768,
                liquidity_net: -10358775050768,
            },
        );

        pool
    }

    #[test]
    fn swap_matches_mainnet_quote() {
        let pool = mainnet_usdc_weth_pool();

        let sqrt_price_start = pool.slot0.sqrt_price_x96;
        let limit = sqrt_price_start * U256::from(15_000u32) / U256::from(10_000u32);

        let result = pool
            .swap(SwapParams::new(false, exact_in(1_098_120), limit))
            .expect("swap should succeed");

        assert_eq!(
            result.amount0_delta,
            I256::from_raw(-U256::from(6222896066140743u64))
        );
        assert_eq!(result.amount1_delta, exact_in(1_098_120));
        assert!(result.sqrt_price_x96 > sqrt_price_start);
    }

    #[test]
    fn crossing_the_last_tick_drops_liquidity_to_zero() {
        let mut pool = V3Pool::new(
            address!("0x1000000000000000000000000000000000000000"),
            address!("0x0000000000000000000000000000000000000001"),
            address!("0x0000000000000000000000000000000000000002"),
            FeeTier::Medium,
        );
        pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap();
        let (_, deposited1) = pool.modify_position(-120, 120, 1_000_000_000_000).unwrap();

        let limit = get_sqrt_ratio_at_tick(-600).unwrap();
        let result = pool
            .swap(SwapParams::new(true, I256::MAX, limit))
            .unwrap();

        assert_eq!(result.liquidity, 0);
        assert_eq!(result.sqrt_price_x96, limit);
        assert_eq!(result.tick, -600);
        assert!(result.amount0_delta.is_positive());
        assert!(result.amount1_delta.is_negative());
        assert!(result.amount1_delta.unsigned_abs() <= deposited1.unsigned_abs());

        pool.apply_swap(&result);
        assert_eq!(pool.slot0.tick, -600);
        assert_eq!(pool.liquidity, 0);
    }

    #[test]
    fn exact_output_charges_input_including_fee() {
        let mut pool = V3Pool::new(
            address!("0x1000000000000000000000000000000000000000"),
            address!("0x0000000000000000000000000000000000000001"),
            address!("0x0000000000000000000000000000000000000002"),
            FeeTier::Medium,
        );
        pool.initialize(get_sqrt_ratio_at_tick(0).unwrap()).unwrap();
        pool.modify_position(-6000, 6000, 1_000_000_000_000_000).unwrap();

        let wanted = U256::from(1_000_000u64);
        let result = pool
            .swap(SwapParams::new(
                true,
                -I256::from_raw(wanted),
                default_sqrt_price_limit(true),
            ))
            .unwrap();

        assert_eq!(result.amount1_delta, -I256::from_raw(wanted));
        // 0.3% fee on roughly equal value at tick 0
        assert!(result.amount0_delta > I256::from_raw(U256::from(1_003_000u64)));
        assert!(result.amount0_delta < I256::from_raw(U256::from(1_004_000u64)));
    }
}
