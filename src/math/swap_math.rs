use crate::U256_E6;
use crate::error::Error;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta_base, get_amount_1_delta_base, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use alloy_primitives::{I256, U256};

/// Result of swapping within a single initialized-tick interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_price_next_x96: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_amount: U256,
}

/// Swaps as far toward `sqrt_price_target_x96` as `amount_remaining`
/// allows. A positive `amount_remaining` is an exact input, a negative one
/// an exact output. `fee_pips` is in hundredths of a basis point.
pub fn compute_swap_step(
    sqrt_price_current_x96: U256,
    sqrt_price_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<SwapStep, Error> {
    let zero_for_one = sqrt_price_current_x96 >= sqrt_price_target_x96;
    let exact_in = !amount_remaining.is_negative();
    let fee = U256::from(fee_pips);
    let remaining = amount_remaining.unsigned_abs();

    let amount_in_for = |from: U256, to: U256, round_up: bool| -> Result<U256, Error> {
        if zero_for_one {
            get_amount_0_delta_base(to, from, liquidity, round_up)
        } else {
            Ok(get_amount_1_delta_base(from, to, liquidity, round_up)?)
        }
    };
    let amount_out_for = |from: U256, to: U256| -> Result<U256, Error> {
        if zero_for_one {
            Ok(get_amount_1_delta_base(to, from, liquidity, false)?)
        } else {
            get_amount_0_delta_base(from, to, liquidity, false)
        }
    };

    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    let sqrt_price_next_x96 = if exact_in {
        let remaining_less_fee = mul_div(remaining, U256_E6 - fee, U256_E6)?;
        amount_in = amount_in_for(sqrt_price_current_x96, sqrt_price_target_x96, true)?;
        if remaining_less_fee >= amount_in {
            sqrt_price_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_price_current_x96,
                liquidity,
                remaining_less_fee,
                zero_for_one,
            )?
        }
    } else {
        amount_out = amount_out_for(sqrt_price_current_x96, sqrt_price_target_x96)?;
        if remaining >= amount_out {
            sqrt_price_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_price_current_x96,
                liquidity,
                remaining,
                zero_for_one,
            )?
        }
    };

    let reached_target = sqrt_price_next_x96 == sqrt_price_target_x96;

    if !(reached_target && exact_in) {
        amount_in = amount_in_for(sqrt_price_current_x96, sqrt_price_next_x96, true)?;
    }
    if !(reached_target && !exact_in) {
        amount_out = amount_out_for(sqrt_price_current_x96, sqrt_price_next_x96)?;
    }

    // exact output never hands out more than was asked for
    if !exact_in && amount_out > remaining {
        amount_out = remaining;
    }

    let fee_amount = if exact_in && !reached_target {
        // the rest of the input is kept as fee
        remaining - amount_in
    } else {
        mul_div_rounding_up(amount_in, fee, U256_E6 - fee)?
    };

    Ok(SwapStep {
        sqrt_price_next_x96,
        amount_in,
        amount_out,
        fee_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sqrt_price_math::get_next_sqrt_price_from_input;
    use std::str::FromStr;

    fn u(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    const PRICE_ONE: &str = "79228162514264337593543950336";
    const PRICE_1_01: &str = "79623317895830914510639640423";

    #[test]
    fn exact_in_capped_at_target_price() {
        let amount = I256::from_raw(U256::from(10u128.pow(18)));
        let step = compute_swap_step(u(PRICE_ONE), u(PRICE_1_01), 2 * 10u128.pow(18), amount, 600)
            .unwrap();

        assert_eq!(step.amount_in, u("9975124224178055"));
        assert_eq!(step.fee_amount, u("5988667735148"));
        assert_eq!(step.amount_out, u("9925619580021728"));
        assert_eq!(step.sqrt_price_next_x96, u(PRICE_1_01));
        assert!(step.amount_in + step.fee_amount < amount.unsigned_abs());
    }

    #[test]
    fn exact_in_fully_spent_before_target() {
        let amount = I256::from_raw(U256::from(10u128.pow(18)));
        let target = u("250541448375047931186413801569");
        let liquidity = 2 * 10u128.pow(18);
        let step = compute_swap_step(u(PRICE_ONE), target, liquidity, amount, 600).unwrap();

        assert_eq!(step.amount_in, u("999400000000000000"));
        assert_eq!(step.fee_amount, u("600000000000000"));
        assert_eq!(step.amount_out, u("666399946655997866"));
        assert_eq!(step.amount_in + step.fee_amount, amount.unsigned_abs());

        let expected = get_next_sqrt_price_from_input(
            u(PRICE_ONE),
            liquidity,
            amount.unsigned_abs() - step.fee_amount,
            false,
        )
        .unwrap();
        assert_eq!(step.sqrt_price_next_x96, expected);
    }

    #[test]
    fn exact_out_capped_at_remaining() {
        let step = compute_swap_step(
            u("417332158212080721273783715441582"),
            u("1452870262520218020823638996"),
            159344665391607089467575320103,
            I256::from_raw(U256::ONE).wrapping_neg(),
            1,
        )
        .unwrap();

        assert_eq!(step.amount_in, U256::ONE);
        assert_eq!(step.fee_amount, U256::ONE);
        assert_eq!(step.amount_out, U256::ONE);
        assert_eq!(step.sqrt_price_next_x96, u("417332158212080721273783715441581"));
    }

    #[test]
    fn exact_in_of_one_wei_is_all_fee() {
        let step = compute_swap_step(
            U256::from(2413u64),
            u("79887613182836312"),
            1985041575832132834610021537970,
            I256::from_raw(U256::from(10u64)),
            1872,
        )
        .unwrap();

        assert_eq!(step.amount_in, U256::ZERO);
        assert_eq!(step.fee_amount, U256::from(10u64));
        assert_eq!(step.amount_out, U256::ZERO);
        assert_eq!(step.sqrt_price_next_x96, U256::from(2413u64));
    }
}
