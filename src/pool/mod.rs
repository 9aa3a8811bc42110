pub mod handle;
pub mod sizer;
pub mod strategy;

pub use handle::{ExchangeRates, LiquidityReceipt, MintedPosition, PoolHandle, SwapReceipt};
pub use sizer::{PositionSize, position_amounts, size_position};
