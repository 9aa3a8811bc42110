#![allow(dead_code)]

use criterion::Criterion;
use dexsim::catalog::WETH;
use dexsim::env::Slot0;
use dexsim::math::fixed_point::FixedPointConverter;
use dexsim::math::price_tick::{Rounding, price_range_to_ticks, price_to_tick};
use dexsim::math::{
    liquidity_math, math_helpers, sqrt_price_math, swap_math, tick_bitmap, tick_math,
};
use dexsim::pool::size_position;
use dexsim::{FastMap, I256, U256};
use std::hint::black_box;

const TICKS: [i32; 5] = [-887_272, -224_701, 0, 69_080, 887_272];

fn e18(x: u64) -> U256 {
    U256::from(x) * U256::from(10u64).pow(U256::from(18u8))
}

pub fn bench_tick_math(c: &mut Criterion) {
    c.bench_function("get_sqrt_ratio_at_tick", |b| {
        b.iter(|| {
            for tick in TICKS {
                black_box(tick_math::get_sqrt_ratio_at_tick(black_box(tick)).unwrap());
            }
        })
    });

    let ratios: Vec<U256> = TICKS
        .iter()
        .map(|&tick| tick_math::get_sqrt_ratio_at_tick(tick).unwrap())
        .collect();
    c.bench_function("get_tick_at_sqrt_ratio", |b| {
        b.iter(|| {
            for ratio in &ratios[..4] {
                black_box(tick_math::get_tick_at_sqrt_ratio(black_box(*ratio)).unwrap());
            }
        })
    });
}

pub fn bench_sqrt_price_math(c: &mut Criterion) {
    let sqrt_price = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
    let sqrt_upper = tick_math::get_sqrt_ratio_at_tick(600).unwrap();
    let liquidity = 1_000_000_000_000_000_000u128;

    c.bench_function("get_next_sqrt_price_from_input", |b| {
        b.iter(|| {
            black_box(
                sqrt_price_math::get_next_sqrt_price_from_input(
                    black_box(sqrt_price),
                    liquidity,
                    e18(1) / U256::from(10u8),
                    true,
                )
                .unwrap(),
            )
        })
    });

    c.bench_function("get_next_sqrt_price_from_output", |b| {
        b.iter(|| {
            black_box(
                sqrt_price_math::get_next_sqrt_price_from_output(
                    black_box(sqrt_price),
                    liquidity,
                    e18(1) / U256::from(10u8),
                    false,
                )
                .unwrap(),
            )
        })
    });

    c.bench_function("get_amount_deltas", |b| {
        b.iter(|| {
            black_box(
                sqrt_price_math::get_amount_0_delta(sqrt_price, sqrt_upper, liquidity as i128)
                    .unwrap(),
            );
            black_box(
                sqrt_price_math::get_amount_1_delta(sqrt_price, sqrt_upper, -(liquidity as i128))
                    .unwrap(),
            );
        })
    });
}

pub fn bench_swap_math(c: &mut Criterion) {
    let current = tick_math::get_sqrt_ratio_at_tick(-224_701).unwrap();
    let target = tick_math::get_sqrt_ratio_at_tick(-224_700).unwrap();
    let liquidity = 203_624_297_715_738_503_472u128;

    c.bench_function("compute_swap_step_exact_in", |b| {
        b.iter(|| {
            black_box(
                swap_math::compute_swap_step(
                    black_box(current),
                    target,
                    liquidity,
                    I256::from_raw(U256::from(1_098_120u64)),
                    500,
                )
                .unwrap(),
            )
        })
    });

    c.bench_function("compute_swap_step_exact_out", |b| {
        b.iter(|| {
            black_box(
                swap_math::compute_swap_step(
                    black_box(current),
                    target,
                    liquidity,
                    -I256::from_raw(U256::from(1_000_000u64)),
                    3000,
                )
                .unwrap(),
            )
        })
    });
}

pub fn bench_math_helpers(c: &mut Criterion) {
    let a = U256::MAX / U256::from(3u8);
    let b = U256::from(1u8) << 128;
    let denominator = U256::from(1u8) << 200;

    c.bench_function("mul_div", |bench| {
        bench.iter(|| black_box(math_helpers::mul_div(black_box(a), b, denominator).unwrap()))
    });
    c.bench_function("mul_div_rounding_up", |bench| {
        bench.iter(|| {
            black_box(math_helpers::mul_div_rounding_up(black_box(a), b, denominator).unwrap())
        })
    });
}

pub fn bench_tick_bitmap(c: &mut Criterion) {
    let mut bitmap = FastMap::default();
    for tick in (-6000..=6000).step_by(600) {
        tick_bitmap::flip_tick(&mut bitmap, tick, 60).unwrap();
    }

    c.bench_function("next_initialized_tick_within_one_word", |b| {
        b.iter(|| {
            black_box(
                tick_bitmap::next_initialized_tick_within_one_word(&bitmap, black_box(1234), 60, true)
                    .unwrap(),
            );
            black_box(
                tick_bitmap::next_initialized_tick_within_one_word(&bitmap, black_box(1234), 60, false)
                    .unwrap(),
            );
        })
    });
}

pub fn bench_price_conversion(c: &mut Criterion) {
    let converter = FixedPointConverter::default();

    c.bench_function("to_base_units", |b| {
        b.iter(|| black_box(converter.to_base_units(&WETH, black_box(1.234_567_891)).unwrap()))
    });
    c.bench_function("price_to_tick", |b| {
        b.iter(|| black_box(price_to_tick(black_box(2.0e-10), 10, Rounding::Down).unwrap()))
    });
    c.bench_function("price_range_to_ticks", |b| {
        b.iter(|| black_box(price_range_to_ticks(black_box(1.9e-10), 2.1e-10, 10).unwrap()))
    });
}

pub fn bench_position_sizing(c: &mut Criterion) {
    let current = Slot0 {
        sqrt_price_x96: tick_math::get_sqrt_ratio_at_tick(-223_000).unwrap(),
        tick: -223_000,
    };
    let lower = tick_math::get_sqrt_ratio_at_tick(-223_600).unwrap();
    let upper = tick_math::get_sqrt_ratio_at_tick(-222_400).unwrap();

    c.bench_function("size_position_in_range", |b| {
        b.iter(|| {
            black_box(
                size_position(
                    black_box(U256::from(10_000_000_000u64)),
                    e18(2),
                    -223_600,
                    -222_400,
                    10,
                    current,
                )
                .unwrap(),
            )
        })
    });

    c.bench_function("get_liquidity_for_amounts", |b| {
        b.iter(|| {
            black_box(
                liquidity_math::get_liquidity_for_amounts(
                    current.sqrt_price_x96,
                    lower,
                    upper,
                    black_box(U256::from(10_000_000_000u64)),
                    e18(2),
                )
                .unwrap(),
            )
        })
    });
}
