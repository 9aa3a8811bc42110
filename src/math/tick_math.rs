use crate::error::StateError;
use alloy_primitives::{I256, U256};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

const SQRT_10001: I256 = I256::from_raw(U256::from_limbs([11745905768312294533, 13863, 0, 0]));
const TICK_LOW: I256 = I256::from_raw(U256::from_limbs([
    6552757943157144234,
    184476617836266586,
    0,
    0,
]));
const TICK_HIGH: I256 = I256::from_raw(U256::from_limbs([
    4998474450511881007,
    15793544031827761793,
    0,
    0,
]));

/// Q128 multipliers `1 / sqrt(1.0001)^(2^i)` for bits 1..=19 of |tick|,
/// as `(low limb, high limb)`.
const RATIO_MULTIPLIERS: [(u64, u64); 19] = [
    (6459403834229662010, 18444899583751176498),
    (17226890335427755468, 18443055278223354162),
    (2032852871939366096, 18439367220385604838),
    (14545316742740207172, 18431993317065449817),
    (5129152022828963008, 18417254355718160513),
    (4894419605888772193, 18387811781193591352),
    (1280255884321894483, 18329067761203520168),
    (15924666964335305636, 18212142134806087854),
    (8010504389359918676, 17980523815641551639),
    (10668036004952895731, 17526086738831147013),
    (4878133418470705625, 16651378430235024244),
    (9537173718739605541, 15030750278693429944),
    (9972618978014552549, 12247334978882834399),
    (10428997489610666743, 8131365268884726200),
    (9305304367709015974, 3584323654723342297),
    (14301143598189091785, 696457651847595233),
    (7393154844743099908, 26294789957452057),
    (2209338891292245656, 37481735321082),
    (10518117631919034274, 76158723),
];

/// Returns the sqrt price (Q64.96) at a tick index, or
/// `StateError::TickOutOfBounds` outside `[MIN_TICK, MAX_TICK]`.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, StateError> {
    let abs_tick = tick.unsigned_abs();

    if abs_tick > MAX_TICK as u32 {
        return Err(StateError::TickOutOfBounds);
    }

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737, 18445821805675392311, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    for (i, &(low, high)) in RATIO_MULTIPLIERS.iter().enumerate() {
        if abs_tick & (2 << i) != 0 {
            ratio = ratio.wrapping_mul(U256::from_limbs([low, high, 0, 0])) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the result never undershoots the tick.
    let rounds_up = ratio.as_limbs()[0] & 0xFFFF_FFFF != 0;
    Ok((ratio >> 32) + U256::from(rounds_up as u64))
}

/// Index of the most significant set bit, for non‑zero inputs.
#[inline]
fn msb(r: U256) -> u32 {
    255 - r.leading_zeros() as u32
}

/// Computes the greatest tick whose sqrt ratio is `<=` the given Q64.96
/// sqrt price. This is the floor of the continuous tick.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x_96: U256) -> Result<i32, StateError> {
    if sqrt_price_x_96 < MIN_SQRT_RATIO || sqrt_price_x_96 >= MAX_SQRT_RATIO {
        return Err(StateError::SqrtPriceOutOfBounds);
    }

    let ratio = sqrt_price_x_96 << 32;
    let msb = msb(ratio);

    let mut r = if msb >= 128 {
        ratio >> (msb - 127) as usize
    } else {
        ratio << (127 - msb) as usize
    };

    let mut log_2: I256 =
        (I256::from_raw(U256::from(msb)) - I256::from_raw(U256::from(128u8))) << 64;

    for shift in (50..=63usize).rev() {
        r = r.overflowing_mul(r).0 >> 127;
        let f: U256 = r >> 128;
        log_2 |= I256::from_raw(f << shift);
        r >>= f.to::<usize>();
    }

    let log_sqrt10001 = log_2.wrapping_mul(SQRT_10001);
    let tick_low = ((log_sqrt10001 - TICK_LOW) >> 128usize).low_i32();
    let tick_high = ((log_sqrt10001 + TICK_HIGH) >> 128usize).low_i32();

    Ok(if tick_low == tick_high {
        tick_low
    } else if get_sqrt_ratio_at_tick(tick_high)? <= sqrt_price_x_96 {
        tick_high
    } else {
        tick_low
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sqrt_ratio_rejects_ticks_outside_bounds() {
        assert!(matches!(
            get_sqrt_ratio_at_tick(MIN_TICK - 1),
            Err(StateError::TickOutOfBounds)
        ));
        assert!(matches!(
            get_sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(StateError::TickOutOfBounds)
        ));
    }

    #[test]
    fn sqrt_ratio_matches_protocol_vectors() {
        let cases: [(i32, &str); 10] = [
            (MIN_TICK, "4295128739"),
            (MIN_TICK + 1, "4295343490"),
            (0, "79228162514264337593543950336"),
            (50, "79426470787362580746886972461"),
            (500, "81233731461783161732293370115"),
            (5000, "101729702841318637793976746270"),
            (150000, "143194173941309278083010301478497"),
            (738203, "847134979253254120489401328389043031315994541"),
            (MAX_TICK - 1, "1461373636630004318706518188784493106690254656249"),
            (MAX_TICK, "1461446703485210103287273052203988822378723970342"),
        ];
        for (tick, expected) in cases {
            assert_eq!(
                get_sqrt_ratio_at_tick(tick).unwrap(),
                U256::from_str(expected).unwrap(),
                "sqrt ratio at {tick} incorrect"
            );
        }
    }

    #[test]
    fn tick_at_sqrt_ratio_rejects_prices_outside_bounds() {
        assert!(matches!(
            get_tick_at_sqrt_ratio(MIN_SQRT_RATIO - U256::ONE),
            Err(StateError::SqrtPriceOutOfBounds)
        ));
        assert!(matches!(
            get_tick_at_sqrt_ratio(MAX_SQRT_RATIO),
            Err(StateError::SqrtPriceOutOfBounds)
        ));
    }

    #[test]
    fn tick_at_sqrt_ratio_inverts_at_bounds() {
        assert_eq!(get_tick_at_sqrt_ratio(MIN_SQRT_RATIO).unwrap(), MIN_TICK);
        assert_eq!(
            get_tick_at_sqrt_ratio(U256::from(4295343490u64)).unwrap(),
            MIN_TICK + 1
        );
        assert_eq!(
            get_tick_at_sqrt_ratio(MAX_SQRT_RATIO - U256::ONE).unwrap(),
            MAX_TICK - 1
        );
    }

    #[test]
    fn tick_at_sqrt_ratio_floors_between_ticks() {
        for tick in [-85177, -27728, -1, 0, 1, 191150] {
            let at = get_sqrt_ratio_at_tick(tick).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(at).unwrap(), tick);
            assert_eq!(get_tick_at_sqrt_ratio(at + U256::ONE).unwrap(), tick);
            assert_eq!(get_tick_at_sqrt_ratio(at - U256::ONE).unwrap(), tick - 1);
        }
    }
}
