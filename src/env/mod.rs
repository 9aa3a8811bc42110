//! Contract execution environment seam.
//!
//! Pool and lending façades never touch contract state directly. They
//! compute base-unit and tick parameters and submit them through
//! [`ContractEnv`], then read results back the same way. Implementations
//! execute each call to completion before returning.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use thiserror::Error;

/// Handle to the single environment instance shared by every façade.
pub type SharedEnv<E> = Arc<E>;

/// Scale of lending collateral prices.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
/// Basis points in a collateral ratio of one.
pub const BPS: U256 = U256::from_limbs([10_000, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

impl Slot0 {
    pub fn is_initialized(&self) -> bool {
        !self.sqrt_price_x96.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintParams {
    pub pool: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub recipient: Address,
}

/// Liquidity added or removed and the token amounts it moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiquidityChange {
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintResult {
    pub position_id: U256,
    pub change: LiquidityChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionInfo {
    pub owner: Address,
    pub pool: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub tokens_owed0: U256,
    pub tokens_owed1: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapOutcome {
    pub amount_in: U256,
    pub amount_out: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingParams {
    pub collateral_token: Address,
    pub lending_token: Address,
    /// Required collateral value over debt value, in basis points. A loan
    /// is covered while `collateral * price_wad / WAD * BPS` is at least
    /// `debt * collateral_ratio_bps`, the division rounding down.
    pub collateral_ratio_bps: u32,
}

/// Per-account loan record in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoanRecord {
    pub collateral: U256,
    pub debt: U256,
    pub is_healthy: bool,
}

impl LoanRecord {
    pub fn is_active(&self) -> bool {
        !self.collateral.is_zero() || !self.debt.is_zero()
    }
}

/// Why a contract rejected a call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Revert {
    #[error("pool already initialized")]
    AlreadyInitialized,
    #[error("pool not initialized")]
    NotInitialized,
    #[error("insufficient token balance")]
    InsufficientBalance,
    #[error("unknown position")]
    UnknownPosition,
    #[error("caller is not approved for the position")]
    NotApproved,
    #[error("collateral does not cover the loan")]
    InsufficientCollateral,
    #[error("outstanding debt requires the collateral")]
    OutstandingDebt,
    #[error("not enough liquidity")]
    InsufficientLiquidity,
    #[error("liquidity amount is zero")]
    ZeroLiquidity,
    #[error("pool is not known to the position manager")]
    UnknownPool,
    #[error("loan is healthy")]
    LoanHealthy,
    #[error("repayment exceeds debt")]
    RepayExceedsDebt,
    #[error("caller is not the operator")]
    NotOperator,
    #[error("tick range invalid")]
    InvalidTicks,
    #[error("{0}")]
    Math(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("execution reverted: {0}")]
    Reverted(#[from] Revert),
    #[error("no contract at {0}")]
    NoContract(Address),
}

impl EnvError {
    pub fn revert(&self) -> Option<&Revert> {
        match self {
            EnvError::Reverted(revert) => Some(revert),
            EnvError::NoContract(_) => None,
        }
    }
}

/// Calls the pool and lending layers issue against the contract snapshot.
///
/// `caller` is the account a mutating call is sent from. All token amounts
/// are base units.
pub trait ContractEnv: Send + Sync {
    fn slot0(&self, pool: Address) -> Result<Slot0, EnvError>;

    fn pool_liquidity(&self, pool: Address) -> Result<u128, EnvError>;

    /// Sets the starting price. Returns `false` when the pool already had one.
    fn initialize_pool(&self, pool: Address, sqrt_price_x96: U256) -> Result<bool, EnvError>;

    fn mint_token(&self, token: Address, to: Address, amount: U256) -> Result<(), EnvError>;

    fn burn_token(&self, token: Address, from: Address, amount: U256) -> Result<(), EnvError>;

    fn balance_of(&self, token: Address, owner: Address) -> Result<U256, EnvError>;

    fn mint_position(&self, caller: Address, params: MintParams) -> Result<MintResult, EnvError>;

    fn increase_liquidity(
        &self,
        caller: Address,
        position_id: U256,
        amount0_desired: U256,
        amount1_desired: U256,
    ) -> Result<LiquidityChange, EnvError>;

    /// Removes liquidity; the released amounts become owed to the position.
    fn decrease_liquidity(
        &self,
        caller: Address,
        position_id: U256,
        liquidity: u128,
    ) -> Result<LiquidityChange, EnvError>;

    /// Transfers everything owed to the position to `recipient`.
    fn collect(
        &self,
        caller: Address,
        position_id: U256,
        recipient: Address,
    ) -> Result<(U256, U256), EnvError>;

    fn position(&self, position_id: U256) -> Result<Option<PositionInfo>, EnvError>;

    /// Swaps `amount_in` of the input token, stopping early at
    /// `sqrt_price_limit_x96` when given.
    fn swap_exact_input(
        &self,
        caller: Address,
        pool: Address,
        zero_for_one: bool,
        amount_in: U256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapOutcome, EnvError>;

    /// Deploys a lending pool operated by `deployer`.
    fn deploy_lending_pool(
        &self,
        deployer: Address,
        params: LendingParams,
    ) -> Result<Address, EnvError>;

    /// Sets the collateral price as lending base units per collateral base
    /// unit, scaled by 1e18. Operator only.
    fn set_collateral_price(
        &self,
        caller: Address,
        lending: Address,
        price_wad: U256,
    ) -> Result<(), EnvError>;

    fn collateral_price(&self, lending: Address) -> Result<U256, EnvError>;

    fn supply_lending_token(
        &self,
        caller: Address,
        lending: Address,
        amount: U256,
    ) -> Result<(), EnvError>;

    fn supply_collateral(&self, caller: Address, lending: Address, amount: U256)
    -> Result<(), EnvError>;

    fn withdraw_collateral(
        &self,
        caller: Address,
        lending: Address,
        amount: U256,
    ) -> Result<(), EnvError>;

    fn borrow(&self, caller: Address, lending: Address, amount: U256) -> Result<(), EnvError>;

    fn repay(&self, caller: Address, lending: Address, amount: U256) -> Result<(), EnvError>;

    /// Repays an unhealthy loan on the borrower's behalf and seizes its
    /// collateral.
    fn liquidate(
        &self,
        caller: Address,
        lending: Address,
        borrower: Address,
    ) -> Result<(), EnvError>;

    fn loan(&self, lending: Address, account: Address) -> Result<LoanRecord, EnvError>;

    fn available_to_lend(&self, lending: Address) -> Result<U256, EnvError>;
}
