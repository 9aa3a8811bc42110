//! In-process contract snapshot.
//!
//! [`SimulatedChain`] implements [`ContractEnv`] over plain Rust state: an
//! ERC-20 ledger, one [`V3Pool`] per catalog pool, a non-fungible position
//! manager and any lending pools deployed at runtime. Every call runs under
//! a single lock and either completes or leaves the state untouched.

pub mod ledger;
pub mod lending;
pub mod swap;
pub mod v3_pool;

use crate::{FastMap, FastSet};
use crate::catalog::Catalog;
use crate::env::{
    ContractEnv, EnvError, LendingParams, LiquidityChange, LoanRecord, MintParams, MintResult,
    PositionInfo, Revert, Slot0, SwapOutcome,
};
use crate::error::{Error, StateError};
use crate::math::liquidity_math::get_liquidity_for_amounts;
use crate::math::tick_math::get_sqrt_ratio_at_tick;
use alloy_primitives::{Address, I256, U256, address};
use ledger::Ledger;
use lending::LendingPool;
use parking_lot::Mutex;
use swap::{SwapParams, default_sqrt_price_limit};
use tracing::trace;
use v3_pool::V3Pool;

const ACCOUNT_FACTORY: Address = address!("0xacc0000000000000000000000000000000000001");
const LENDING_FACTORY: Address = address!("0x1e4d000000000000000000000000000000000002");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    owner: Address,
    pool: Address,
    tick_lower: i32,
    tick_upper: i32,
    liquidity: u128,
    tokens_owed0: U256,
    tokens_owed1: U256,
}

impl From<Position> for PositionInfo {
    fn from(p: Position) -> Self {
        PositionInfo {
            owner: p.owner,
            pool: p.pool,
            tick_lower: p.tick_lower,
            tick_upper: p.tick_upper,
            liquidity: p.liquidity,
            tokens_owed0: p.tokens_owed0,
            tokens_owed1: p.tokens_owed1,
        }
    }
}

fn math_revert(err: Error) -> Revert {
    match err {
        Error::StateError(StateError::TickOutOfBounds) => Revert::InvalidTicks,
        Error::StateError(StateError::SqrtPriceIsZero) => Revert::NotInitialized,
        other => Revert::Math(other.to_string()),
    }
}

/// Amount the pool is owed for a signed delta, which must not be negative.
fn owed(delta: I256) -> U256 {
    if delta.is_negative() {
        U256::ZERO
    } else {
        delta.into_raw()
    }
}

#[derive(Debug, Default)]
struct ChainState {
    ledger: Ledger,
    tokens: FastSet<Address>,
    pools: FastMap<Address, V3Pool>,
    positions: FastMap<U256, Position>,
    next_position_id: u64,
    lending: FastMap<Address, LendingPool>,
    lending_nonce: u64,
    account_nonce: u64,
}

impl ChainState {
    fn token(&self, token: Address) -> Result<(), EnvError> {
        if self.tokens.contains(&token) {
            Ok(())
        } else {
            Err(EnvError::NoContract(token))
        }
    }

    fn pool(&self, pool: Address) -> Result<&V3Pool, EnvError> {
        self.pools.get(&pool).ok_or(EnvError::NoContract(pool))
    }

    fn initialized_pool(&self, pool: Address) -> Result<&V3Pool, EnvError> {
        let pool = self.pool(pool)?;
        if !pool.is_initialized() {
            return Err(Revert::NotInitialized.into());
        }
        Ok(pool)
    }

    fn lending(&self, lending: Address) -> Result<&LendingPool, EnvError> {
        self.lending.get(&lending).ok_or(EnvError::NoContract(lending))
    }

    fn lending_mut(&mut self, lending: Address) -> Result<&mut LendingPool, EnvError> {
        self.lending
            .get_mut(&lending)
            .ok_or(EnvError::NoContract(lending))
    }

    fn position(&self, id: U256) -> Result<Position, EnvError> {
        self.positions
            .get(&id)
            .copied()
            .ok_or(Revert::UnknownPosition.into())
    }

    fn owned_position(&self, caller: Address, id: U256) -> Result<Position, EnvError> {
        let position = self.position(id)?;
        if position.owner != caller {
            return Err(Revert::NotApproved.into());
        }
        Ok(position)
    }

    /// Adds liquidity backed by the desired amounts and charges `payer`.
    fn add_liquidity(
        &mut self,
        payer: Address,
        pool: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0_desired: U256,
        amount1_desired: U256,
    ) -> Result<LiquidityChange, EnvError> {
        let mut next = self.initialized_pool(pool)?.clone();
        next.check_ticks(tick_lower, tick_upper)
            .map_err(|e| math_revert(e.into()))?;

        let liquidity = get_liquidity_for_amounts(
            next.slot0.sqrt_price_x96,
            get_sqrt_ratio_at_tick(tick_lower).map_err(|e| math_revert(e.into()))?,
            get_sqrt_ratio_at_tick(tick_upper).map_err(|e| math_revert(e.into()))?,
            amount0_desired,
            amount1_desired,
        )
        .map_err(|e| math_revert(e.into()))?;
        if liquidity == 0 {
            return Err(Revert::ZeroLiquidity.into());
        }
        let delta = i128::try_from(liquidity)
            .map_err(|_| Revert::Math("liquidity exceeds i128".into()))?;

        let (delta0, delta1) = next
            .modify_position(tick_lower, tick_upper, delta)
            .map_err(math_revert)?;
        let (amount0, amount1) = (owed(delta0), owed(delta1));

        self.ledger.require(next.token0, payer, amount0)?;
        self.ledger.require(next.token1, payer, amount1)?;
        self.ledger.transfer(next.token0, payer, next.address, amount0)?;
        self.ledger.transfer(next.token1, payer, next.address, amount1)?;
        self.pools.insert(next.address, next);

        Ok(LiquidityChange {
            liquidity,
            amount0,
            amount1,
        })
    }
}

/// The contract snapshot, executed in process.
#[derive(Debug)]
pub struct SimulatedChain {
    state: Mutex<ChainState>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new(&Catalog::snapshot())
    }
}

impl SimulatedChain {
    /// Deploys every token and pool of `catalog`. Pools start uninitialized.
    pub fn new(catalog: &Catalog) -> Self {
        let mut state = ChainState {
            next_position_id: 1,
            ..Default::default()
        };
        state.tokens = catalog.tokens().iter().map(|t| t.address).collect();
        for pool in catalog.pools() {
            state.pools.insert(
                pool.address,
                V3Pool::new(
                    pool.address,
                    pool.token0.address,
                    pool.token1.address,
                    pool.fee,
                ),
            );
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// A fresh externally owned account.
    pub fn create_account(&self) -> Address {
        let mut state = self.state.lock();
        let account = ACCOUNT_FACTORY.create(state.account_nonce);
        state.account_nonce += 1;
        account
    }

    pub fn create_accounts(&self, count: usize) -> Vec<Address> {
        (0..count).map(|_| self.create_account()).collect()
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.state.lock().ledger.total_supply(token)
    }

    /// Number of positions ever minted.
    pub fn position_count(&self) -> u64 {
        self.state.lock().next_position_id - 1
    }
}

impl ContractEnv for SimulatedChain {
    fn slot0(&self, pool: Address) -> Result<Slot0, EnvError> {
        Ok(self.state.lock().pool(pool)?.slot0)
    }

    fn pool_liquidity(&self, pool: Address) -> Result<u128, EnvError> {
        Ok(self.state.lock().pool(pool)?.liquidity)
    }

    fn initialize_pool(&self, pool: Address, sqrt_price_x96: U256) -> Result<bool, EnvError> {
        let mut state = self.state.lock();
        let initialized = state
            .pools
            .get_mut(&pool)
            .ok_or(EnvError::NoContract(pool))?
            .initialize(sqrt_price_x96)
            .map_err(math_revert)?;
        trace!(%pool, %sqrt_price_x96, initialized, "initialize");
        Ok(initialized)
    }

    fn mint_token(&self, token: Address, to: Address, amount: U256) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        state.token(token)?;
        state.ledger.mint(token, to, amount)?;
        Ok(())
    }

    fn burn_token(&self, token: Address, from: Address, amount: U256) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        state.token(token)?;
        state.ledger.burn(token, from, amount)?;
        Ok(())
    }

    fn balance_of(&self, token: Address, owner: Address) -> Result<U256, EnvError> {
        let state = self.state.lock();
        state.token(token)?;
        Ok(state.ledger.balance_of(token, owner))
    }

    fn mint_position(&self, caller: Address, params: MintParams) -> Result<MintResult, EnvError> {
        let mut state = self.state.lock();
        let change = state.add_liquidity(
            caller,
            params.pool,
            params.tick_lower,
            params.tick_upper,
            params.amount0_desired,
            params.amount1_desired,
        )?;

        let position_id = U256::from(state.next_position_id);
        state.next_position_id += 1;
        state.positions.insert(
            position_id,
            Position {
                owner: params.recipient,
                pool: params.pool,
                tick_lower: params.tick_lower,
                tick_upper: params.tick_upper,
                liquidity: change.liquidity,
                tokens_owed0: U256::ZERO,
                tokens_owed1: U256::ZERO,
            },
        );
        trace!(%position_id, pool = %params.pool, liquidity = change.liquidity, "mint");
        Ok(MintResult {
            position_id,
            change,
        })
    }

    fn increase_liquidity(
        &self,
        caller: Address,
        position_id: U256,
        amount0_desired: U256,
        amount1_desired: U256,
    ) -> Result<LiquidityChange, EnvError> {
        let mut state = self.state.lock();
        let position = state.position(position_id)?;
        let change = state.add_liquidity(
            caller,
            position.pool,
            position.tick_lower,
            position.tick_upper,
            amount0_desired,
            amount1_desired,
        )?;
        if let Some(p) = state.positions.get_mut(&position_id) {
            p.liquidity += change.liquidity;
        }
        Ok(change)
    }

    fn decrease_liquidity(
        &self,
        caller: Address,
        position_id: U256,
        liquidity: u128,
    ) -> Result<LiquidityChange, EnvError> {
        let mut state = self.state.lock();
        let position = state.owned_position(caller, position_id)?;
        if liquidity == 0 {
            return Err(Revert::ZeroLiquidity.into());
        }
        if liquidity > position.liquidity {
            return Err(Revert::InsufficientLiquidity.into());
        }
        let delta = i128::try_from(liquidity)
            .map_err(|_| Revert::Math("liquidity exceeds i128".into()))?;

        let pool = state
            .pools
            .get_mut(&position.pool)
            .ok_or(EnvError::NoContract(position.pool))?;
        let (delta0, delta1) = pool
            .modify_position(position.tick_lower, position.tick_upper, -delta)
            .map_err(math_revert)?;
        let amount0 = delta0.unsigned_abs();
        let amount1 = delta1.unsigned_abs();

        if let Some(p) = state.positions.get_mut(&position_id) {
            p.liquidity -= liquidity;
            p.tokens_owed0 += amount0;
            p.tokens_owed1 += amount1;
        }
        Ok(LiquidityChange {
            liquidity,
            amount0,
            amount1,
        })
    }

    fn collect(
        &self,
        caller: Address,
        position_id: U256,
        recipient: Address,
    ) -> Result<(U256, U256), EnvError> {
        let mut state = self.state.lock();
        let position = state.owned_position(caller, position_id)?;
        let (token0, token1) = {
            let pool = state.pool(position.pool)?;
            (pool.token0, pool.token1)
        };

        state.ledger.require(token0, position.pool, position.tokens_owed0)?;
        state.ledger.require(token1, position.pool, position.tokens_owed1)?;
        state
            .ledger
            .transfer(token0, position.pool, recipient, position.tokens_owed0)?;
        state
            .ledger
            .transfer(token1, position.pool, recipient, position.tokens_owed1)?;

        if let Some(p) = state.positions.get_mut(&position_id) {
            p.tokens_owed0 = U256::ZERO;
            p.tokens_owed1 = U256::ZERO;
        }
        Ok((position.tokens_owed0, position.tokens_owed1))
    }

    fn position(&self, position_id: U256) -> Result<Option<PositionInfo>, EnvError> {
        Ok(self
            .state
            .lock()
            .positions
            .get(&position_id)
            .copied()
            .map(PositionInfo::from))
    }

    fn swap_exact_input(
        &self,
        caller: Address,
        pool: Address,
        zero_for_one: bool,
        amount_in: U256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapOutcome, EnvError> {
        let mut state = self.state.lock();
        let v3 = state.initialized_pool(pool)?;
        let (token_in, token_out) = if zero_for_one {
            (v3.token0, v3.token1)
        } else {
            (v3.token1, v3.token0)
        };
        state.ledger.require(token_in, caller, amount_in)?;

        let amount_specified = I256::try_from(amount_in)
            .map_err(|_| Revert::Math("swap amount exceeds int256".into()))?;
        let params = SwapParams::new(
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96.unwrap_or_else(|| default_sqrt_price_limit(zero_for_one)),
        );
        let result = v3.swap(params).map_err(math_revert)?;

        let (delta_in, delta_out) = if zero_for_one {
            (result.amount0_delta, result.amount1_delta)
        } else {
            (result.amount1_delta, result.amount0_delta)
        };
        let spent = owed(delta_in);
        let received = delta_out.unsigned_abs();
        if received.is_zero() {
            return Err(Revert::InsufficientLiquidity.into());
        }

        state.ledger.require(token_out, pool, received)?;
        state.ledger.transfer(token_in, caller, pool, spent)?;
        state.ledger.transfer(token_out, pool, caller, received)?;
        if let Some(v3) = state.pools.get_mut(&pool) {
            v3.apply_swap(&result);
        }
        trace!(%pool, zero_for_one, %spent, %received, tick = result.tick, "swap");

        Ok(SwapOutcome {
            amount_in: spent,
            amount_out: received,
        })
    }

    fn deploy_lending_pool(
        &self,
        deployer: Address,
        params: LendingParams,
    ) -> Result<Address, EnvError> {
        let mut state = self.state.lock();
        state.token(params.collateral_token)?;
        state.token(params.lending_token)?;

        let address = LENDING_FACTORY.create(state.lending_nonce);
        state.lending_nonce += 1;
        state
            .lending
            .insert(address, LendingPool::new(address, deployer, params));
        trace!(%address, %deployer, "deploy lending pool");
        Ok(address)
    }

    fn set_collateral_price(
        &self,
        caller: Address,
        lending: Address,
        price_wad: U256,
    ) -> Result<(), EnvError> {
        self.state
            .lock()
            .lending_mut(lending)?
            .set_price(caller, price_wad)?;
        Ok(())
    }

    fn collateral_price(&self, lending: Address) -> Result<U256, EnvError> {
        Ok(self.state.lock().lending(lending)?.price_wad)
    }

    fn supply_lending_token(
        &self,
        caller: Address,
        lending: Address,
        amount: U256,
    ) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        let token = state.lending(lending)?.params.lending_token;
        state.ledger.transfer(token, caller, lending, amount)?;
        Ok(())
    }

    fn supply_collateral(
        &self,
        caller: Address,
        lending: Address,
        amount: U256,
    ) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        let token = state.lending(lending)?.params.collateral_token;
        state.ledger.transfer(token, caller, lending, amount)?;
        state.lending_mut(lending)?.add_collateral(caller, amount);
        Ok(())
    }

    fn withdraw_collateral(
        &self,
        caller: Address,
        lending: Address,
        amount: U256,
    ) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        let pool = state.lending(lending)?;
        pool.check_withdraw(&caller, amount)?;
        let token = pool.params.collateral_token;

        state.ledger.transfer(token, lending, caller, amount)?;
        state.lending_mut(lending)?.withdraw(caller, amount)?;
        Ok(())
    }

    fn borrow(&self, caller: Address, lending: Address, amount: U256) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        let pool = state.lending(lending)?;
        let token = pool.params.lending_token;
        if state.ledger.balance_of(token, lending) < amount {
            return Err(Revert::InsufficientLiquidity.into());
        }
        pool.check_borrow(&caller, amount)?;

        state.ledger.transfer(token, lending, caller, amount)?;
        state.lending_mut(lending)?.borrow(caller, amount)?;
        Ok(())
    }

    fn repay(&self, caller: Address, lending: Address, amount: U256) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        let pool = state.lending(lending)?;
        pool.check_repay(&caller, amount)?;
        let token = pool.params.lending_token;

        state.ledger.transfer(token, caller, lending, amount)?;
        state.lending_mut(lending)?.repay(caller, amount)?;
        Ok(())
    }

    fn liquidate(
        &self,
        caller: Address,
        lending: Address,
        borrower: Address,
    ) -> Result<(), EnvError> {
        let mut state = self.state.lock();
        let pool = state.lending(lending)?;
        let loan = pool.check_liquidate(&borrower)?;
        let LendingParams {
            collateral_token,
            lending_token,
            ..
        } = pool.params;

        state.ledger.require(lending_token, caller, loan.debt)?;
        state.ledger.transfer(lending_token, caller, lending, loan.debt)?;
        state
            .ledger
            .transfer(collateral_token, lending, caller, loan.collateral)?;
        state.lending_mut(lending)?.close(&borrower);
        trace!(%lending, %borrower, liquidator = %caller, "liquidate");
        Ok(())
    }

    fn loan(&self, lending: Address, account: Address) -> Result<LoanRecord, EnvError> {
        Ok(self.state.lock().lending(lending)?.record(&account)?)
    }

    fn available_to_lend(&self, lending: Address) -> Result<U256, EnvError> {
        let state = self.state.lock();
        let token = state.lending(lending)?.params.lending_token;
        Ok(state.ledger.balance_of(token, lending))
    }
}
