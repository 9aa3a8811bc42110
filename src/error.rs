use crate::config::ConfigError;
use crate::env::EnvError;
use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - out of bounds")]
    OutOfBounds,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("BitMath error - zero input value")]
    ZeroValue,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - tick out of bounds")]
    TickOutOfBounds,

    #[error("State error - liquidity is 0")]
    LiquidityIsZero,

    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("Swap error - amount specified is 0")]
    AmountSpecifiedIsZero,
    #[error("Swap error - no liquidity in range")]
    LiquidityIsZero,
    #[error("Swap error - sqrtPrice limit out of bounds")]
    SqrtPriceOutOfBounds,
}

/// Errors surfaced by the position math engine and its façades.
///
/// Validation variants are always raised before any mutating call reaches
/// the execution environment. Failures reported by the environment itself
/// arrive as [`Error::CollaboratorError`], or as one of the lending variants
/// when the facility's rejection has a precise meaning.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] MathError),

    #[error(transparent)]
    StateError(#[from] StateError),

    #[error(transparent)]
    SwapError(#[from] SwapError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("amount {amount} of {symbol} exceeds its {decimals} decimal places")]
    PrecisionError {
        symbol: &'static str,
        amount: f64,
        decimals: u8,
    },

    #[error("amount {0} is not a finite, non-negative number")]
    InvalidAmountError(f64),

    #[error("price {0} must be finite and greater than zero")]
    InvalidPriceError(f64),

    #[error("price range [{lower}, {upper}] is empty or inverted")]
    InvalidRangeError { lower: f64, upper: f64 },

    #[error("fraction {0} is outside (0, 1]")]
    InvalidFractionError(f64),

    #[error("tick {0} is outside the protocol bounds or not aligned to the tick spacing")]
    TickBoundsError(i32),

    #[error("insufficient {side} amount to open a position over the requested range")]
    InsufficientAmountError { side: &'static str },

    #[error("account {account} does not own position {position_id}")]
    NotOwnerError { position_id: U256, account: Address },

    #[error("position {0} not found")]
    PositionNotFoundError(U256),

    #[error("pool '{pool}' cannot report a price")]
    StaleRateError { pool: String },

    #[error("borrow of {amount} on '{lending}' by {account} is not covered by posted collateral")]
    UndercollateralizedError {
        lending: String,
        account: Address,
        amount: f64,
    },

    #[error("withdrawal on '{lending}' by {account} would leave outstanding debt uncovered")]
    ActiveDebtError { lending: String, account: Address },

    #[error("no pool named '{0}'")]
    PoolNotFoundError(String),

    #[error("no lending facility named '{0}'")]
    LendingNotFoundError(String),

    #[error("{operation} on '{target}' failed{}: {source}", .account.map(|a| format!(" for {a}")).unwrap_or_default())]
    CollaboratorError {
        operation: &'static str,
        account: Option<Address>,
        target: String,
        #[source]
        source: EnvError,
    },
}

impl Error {
    /// Wraps an environment failure with the operation context it occurred in.
    pub fn collaborator(
        operation: &'static str,
        account: Option<Address>,
        target: impl Into<String>,
        source: EnvError,
    ) -> Self {
        Self::CollaboratorError {
            operation,
            account,
            target: target.into(),
            source,
        }
    }
}
