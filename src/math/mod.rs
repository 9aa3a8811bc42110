pub mod fixed_point;
pub mod liquidity_math;
pub mod math_helpers;
pub mod price_tick;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick_bitmap;
pub mod tick_math;
