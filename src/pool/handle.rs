use crate::catalog::{FeeTier, Token};
use crate::config::PoolDefinition;
use crate::env::{ContractEnv, EnvError, MintParams, PositionInfo, SharedEnv, Slot0};
use crate::error::Error;
use crate::math::fixed_point::FixedPointConverter;
use crate::math::price_tick::{
    PriceScale, price_range_to_ticks, price_to_sqrt_price_x96, sqrt_price_x96_to_price,
};
use crate::pool::sizer::{position_amounts, size_position};
use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

/// Current pool price in whole-token terms, both ways round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRates {
    pub token1_per_token0: f64,
    pub token0_per_token1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MintedPosition {
    pub amount0: f64,
    pub amount1: f64,
    pub liquidity: u128,
    pub position_id: U256,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityReceipt {
    pub liquidity: u128,
    pub amount0: f64,
    pub amount1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapReceipt {
    pub spent: f64,
    pub received: f64,
}

/// Façade over one catalog pool.
///
/// Takes decimal amounts and whole-token prices, turns them into the
/// base-unit and tick parameters the pool contract expects, and converts
/// results back. Every read goes to the environment; nothing is cached.
pub struct PoolHandle<E> {
    definition: PoolDefinition,
    scale: PriceScale,
    converter: FixedPointConverter,
    env: SharedEnv<E>,
}

impl<E> Clone for PoolHandle<E> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            scale: self.scale,
            converter: self.converter,
            env: self.env.clone(),
        }
    }
}

impl<E> std::fmt::Debug for PoolHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("name", &self.definition.name)
            .field("address", &self.definition.pool.address)
            .finish()
    }
}

impl<E: ContractEnv> PoolHandle<E> {
    pub fn new(
        env: SharedEnv<E>,
        definition: PoolDefinition,
        converter: FixedPointConverter,
    ) -> Self {
        let scale = PriceScale::new(&definition.pool.token0, &definition.pool.token1);
        Self {
            definition,
            scale,
            converter,
            env,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &PoolDefinition {
        &self.definition
    }

    pub fn address(&self) -> Address {
        self.definition.pool.address
    }

    pub fn token0(&self) -> &Token {
        self.definition.token0()
    }

    pub fn token1(&self) -> &Token {
        self.definition.token1()
    }

    pub fn fee(&self) -> FeeTier {
        self.definition.fee()
    }

    pub fn tick_spacing(&self) -> i32 {
        self.definition.fee().tick_spacing()
    }

    pub fn converter(&self) -> &FixedPointConverter {
        &self.converter
    }

    pub(crate) fn env(&self) -> &SharedEnv<E> {
        &self.env
    }

    fn collaborator(
        &self,
        operation: &'static str,
        account: Option<Address>,
    ) -> impl FnOnce(EnvError) -> Error + '_ {
        move |source| {
            warn!(pool = %self.definition.name, operation, ?account, error = %source, "pool call rejected");
            Error::collaborator(operation, account, self.definition.name.clone(), source)
        }
    }

    /// Sets the declared starting price unless the pool already has one.
    pub fn initialize_if_necessary(&self) -> Result<bool, Error> {
        let raw = self.scale.to_raw(self.definition.starting_price);
        let sqrt_price_x96 = price_to_sqrt_price_x96(raw)?;
        let initialized = self
            .env
            .initialize_pool(self.address(), sqrt_price_x96)
            .map_err(self.collaborator("initialize", None))?;
        info!(
            pool = %self.definition.name,
            starting_price = self.definition.starting_price,
            initialized,
            "pool ready"
        );
        Ok(initialized)
    }

    pub fn slot0(&self) -> Result<Slot0, Error> {
        self.env
            .slot0(self.address())
            .map_err(self.collaborator("slot0", None))
    }

    /// In-range liquidity.
    pub fn liquidity(&self) -> Result<u128, Error> {
        self.env
            .pool_liquidity(self.address())
            .map_err(self.collaborator("liquidity", None))
    }

    fn initialized_slot0(&self) -> Result<Slot0, Error> {
        let slot0 = self.slot0()?;
        if !slot0.is_initialized() {
            return Err(Error::StaleRateError {
                pool: self.definition.name.clone(),
            });
        }
        Ok(slot0)
    }

    pub fn exchange_rates(&self) -> Result<ExchangeRates, Error> {
        let slot0 = self.initialized_slot0()?;
        let token1_per_token0 = self
            .scale
            .to_human(sqrt_price_x96_to_price(slot0.sqrt_price_x96));
        Ok(ExchangeRates {
            token1_per_token0,
            token0_per_token1: 1.0 / token1_per_token0,
        })
    }

    fn to_base_pair(&self, amount0: f64, amount1: f64) -> Result<(U256, U256), Error> {
        Ok((
            self.converter.to_base_units(self.token0(), amount0)?,
            self.converter.to_base_units(self.token1(), amount1)?,
        ))
    }

    fn to_decimal_pair(&self, amount0: U256, amount1: U256) -> (f64, f64) {
        (
            self.converter.to_decimal(self.token0(), amount0),
            self.converter.to_decimal(self.token1(), amount1),
        )
    }

    /// Credits `account` with both tokens. Zero amounts are skipped.
    pub fn mint_tokens(&self, amount0: f64, amount1: f64, account: Address) -> Result<(), Error> {
        let (base0, base1) = self.to_base_pair(amount0, amount1)?;
        for (token, amount) in [(self.token0(), base0), (self.token1(), base1)] {
            if amount.is_zero() {
                continue;
            }
            self.env
                .mint_token(token.address, account, amount)
                .map_err(self.collaborator("mint_tokens", Some(account)))?;
        }
        Ok(())
    }

    /// Burns each amount the account fully holds and skips the rest.
    /// Returns what was burned.
    pub fn burn_tokens(
        &self,
        amount0: f64,
        amount1: f64,
        account: Address,
    ) -> Result<(f64, f64), Error> {
        let (base0, base1) = self.to_base_pair(amount0, amount1)?;
        let mut burned = [U256::ZERO; 2];
        for (slot, (token, amount)) in [(self.token0(), base0), (self.token1(), base1)]
            .into_iter()
            .enumerate()
        {
            let balance = self
                .env
                .balance_of(token.address, account)
                .map_err(self.collaborator("balance_of", Some(account)))?;
            if amount.is_zero() || balance < amount {
                continue;
            }
            self.env
                .burn_token(token.address, account, amount)
                .map_err(self.collaborator("burn_tokens", Some(account)))?;
            burned[slot] = amount;
        }
        Ok(self.to_decimal_pair(burned[0], burned[1]))
    }

    /// `owner`'s wallet balance of both tokens.
    pub fn token_pair_balance(&self, owner: Address) -> Result<(f64, f64), Error> {
        let balance = |token: &Token| {
            self.env
                .balance_of(token.address, owner)
                .map_err(self.collaborator("balance_of", Some(owner)))
        };
        let base0 = balance(self.token0())?;
        let base1 = balance(self.token1())?;
        Ok(self.to_decimal_pair(base0, base1))
    }

    /// Tokens held by the pool contract.
    pub fn reserves(&self) -> Result<(f64, f64), Error> {
        self.token_pair_balance(self.address())
    }

    /// Opens a position over a price range quoted as token1 per token0.
    ///
    /// The bounds may be given in either order. The lower one is aligned
    /// down and the upper one up, so the position always covers the
    /// requested range.
    pub fn mint_liquidity_position(
        &self,
        amount0: f64,
        amount1: f64,
        price_a: f64,
        price_b: f64,
        account: Address,
    ) -> Result<MintedPosition, Error> {
        if price_a == price_b {
            return Err(Error::InvalidRangeError {
                lower: price_a,
                upper: price_b,
            });
        }
        let (lower_price, upper_price) = if price_a < price_b {
            (price_a, price_b)
        } else {
            (price_b, price_a)
        };
        for price in [lower_price, upper_price] {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidPriceError(price));
            }
        }

        let (tick_lower, tick_upper) = price_range_to_ticks(
            self.scale.to_raw(lower_price),
            self.scale.to_raw(upper_price),
            self.tick_spacing(),
        )?;
        self.mint_position_with_ticks(amount0, amount1, tick_lower, tick_upper, account)
    }

    /// Opens a position over aligned ticks.
    pub fn mint_position_with_ticks(
        &self,
        amount0: f64,
        amount1: f64,
        tick_lower: i32,
        tick_upper: i32,
        account: Address,
    ) -> Result<MintedPosition, Error> {
        let (desired0, desired1) = self.to_base_pair(amount0, amount1)?;
        let current = self.initialized_slot0()?;
        let size = size_position(
            desired0,
            desired1,
            tick_lower,
            tick_upper,
            self.tick_spacing(),
            current,
        )?;
        debug!(
            pool = %self.definition.name,
            %account,
            tick_lower,
            tick_upper,
            liquidity = size.liquidity,
            amount0 = %size.amount0,
            amount1 = %size.amount1,
            "mint position"
        );

        let minted = self
            .env
            .mint_position(
                account,
                MintParams {
                    pool: self.address(),
                    tick_lower,
                    tick_upper,
                    amount0_desired: size.amount0,
                    amount1_desired: size.amount1,
                    recipient: account,
                },
            )
            .map_err(self.collaborator("mint_position", Some(account)))?;

        let (amount0, amount1) = self.to_decimal_pair(minted.change.amount0, minted.change.amount1);
        Ok(MintedPosition {
            amount0,
            amount1,
            liquidity: minted.change.liquidity,
            position_id: minted.position_id,
        })
    }

    /// Position record, provided it belongs to this pool.
    pub fn position(&self, position_id: U256) -> Result<PositionInfo, Error> {
        self.env
            .position(position_id)
            .map_err(self.collaborator("position", None))?
            .filter(|info| info.pool == self.address())
            .ok_or(Error::PositionNotFoundError(position_id))
    }

    fn owned_position(&self, position_id: U256, account: Address) -> Result<PositionInfo, Error> {
        let info = self.position(position_id)?;
        if info.owner != account {
            return Err(Error::NotOwnerError {
                position_id,
                account,
            });
        }
        Ok(info)
    }

    /// Tokens the position currently represents, in whole tokens.
    pub fn position_amounts(&self, position_id: U256) -> Result<(f64, f64), Error> {
        let info = self.position(position_id)?;
        let current = self.initialized_slot0()?;
        let (base0, base1) =
            position_amounts(info.liquidity, info.tick_lower, info.tick_upper, current)?;
        Ok(self.to_decimal_pair(base0, base1))
    }

    /// Adds to an existing position owned by `account`.
    pub fn increase_liquidity(
        &self,
        position_id: U256,
        amount0: f64,
        amount1: f64,
        account: Address,
    ) -> Result<LiquidityReceipt, Error> {
        let info = self.owned_position(position_id, account)?;
        let (desired0, desired1) = self.to_base_pair(amount0, amount1)?;
        let current = self.initialized_slot0()?;
        let size = size_position(
            desired0,
            desired1,
            info.tick_lower,
            info.tick_upper,
            self.tick_spacing(),
            current,
        )?;
        debug!(pool = %self.definition.name, %position_id, liquidity = size.liquidity, "increase liquidity");

        let change = self
            .env
            .increase_liquidity(account, position_id, size.amount0, size.amount1)
            .map_err(self.collaborator("increase_liquidity", Some(account)))?;
        let (amount0, amount1) = self.to_decimal_pair(change.amount0, change.amount1);
        Ok(LiquidityReceipt {
            liquidity: change.liquidity,
            amount0,
            amount1,
        })
    }

    fn withdraw(
        &self,
        position_id: U256,
        liquidity: u128,
        account: Address,
    ) -> Result<(f64, f64), Error> {
        if liquidity > 0 {
            self.env
                .decrease_liquidity(account, position_id, liquidity)
                .map_err(self.collaborator("decrease_liquidity", Some(account)))?;
        }
        let (base0, base1) = self
            .env
            .collect(account, position_id, account)
            .map_err(self.collaborator("collect", Some(account)))?;
        debug!(pool = %self.definition.name, %position_id, liquidity, amount0 = %base0, amount1 = %base1, "withdraw");
        Ok(self.to_decimal_pair(base0, base1))
    }

    /// Removes `fraction` of the position's liquidity, in `(0, 1]`, and
    /// collects the released tokens.
    pub fn remove_liquidity(
        &self,
        position_id: U256,
        fraction: f64,
        account: Address,
    ) -> Result<(f64, f64), Error> {
        if fraction.is_nan() || fraction <= 0.0 || fraction > 1.0 {
            return Err(Error::InvalidFractionError(fraction));
        }
        let info = self.owned_position(position_id, account)?;
        let liquidity = if fraction == 1.0 {
            info.liquidity
        } else {
            ((info.liquidity as f64 * fraction) as u128).min(info.liquidity)
        };
        if liquidity == 0 {
            return Err(Error::InsufficientAmountError { side: "liquidity" });
        }
        self.withdraw(position_id, liquidity, account)
    }

    /// Removes all liquidity from the position and collects every owed
    /// token. The emptied position stays queryable.
    pub fn burn_liquidity_position(
        &self,
        position_id: U256,
        account: Address,
    ) -> Result<(f64, f64), Error> {
        let info = self.owned_position(position_id, account)?;
        self.withdraw(position_id, info.liquidity, account)
    }

    fn swap(
        &self,
        zero_for_one: bool,
        amount: f64,
        account: Address,
    ) -> Result<SwapReceipt, Error> {
        let token_in = if zero_for_one {
            self.token0()
        } else {
            self.token1()
        };
        let amount_in = self.converter.to_base_units(token_in, amount)?;
        if amount_in.is_zero() {
            return Err(Error::InvalidAmountError(amount));
        }
        self.swap_base_units(zero_for_one, amount_in, None, account)
    }

    fn swap_base_units(
        &self,
        zero_for_one: bool,
        amount_in: U256,
        sqrt_price_limit_x96: Option<U256>,
        account: Address,
    ) -> Result<SwapReceipt, Error> {
        let (token_in, token_out) = if zero_for_one {
            (self.token0(), self.token1())
        } else {
            (self.token1(), self.token0())
        };
        debug!(pool = %self.definition.name, %account, zero_for_one, %amount_in, "swap");

        let outcome = self
            .env
            .swap_exact_input(
                account,
                self.address(),
                zero_for_one,
                amount_in,
                sqrt_price_limit_x96,
            )
            .map_err(self.collaborator("swap", Some(account)))?;

        Ok(SwapReceipt {
            spent: self.converter.to_decimal(token_in, outcome.amount_in),
            received: self.converter.to_decimal(token_out, outcome.amount_out),
        })
    }

    /// Sells `amount` of token0 for token1.
    pub fn swap_0_for_1(&self, amount: f64, account: Address) -> Result<SwapReceipt, Error> {
        self.swap(true, amount, account)
    }

    /// Sells `amount` of token1 for token0.
    pub fn swap_1_for_0(&self, amount: f64, account: Address) -> Result<SwapReceipt, Error> {
        self.swap(false, amount, account)
    }

    /// Trades the account's balance of the input token toward
    /// `target_price` (token1 per token0), stopping once the pool reaches
    /// it. Returns `None` when the pool is already there.
    pub fn move_price_to(
        &self,
        target_price: f64,
        account: Address,
    ) -> Result<Option<SwapReceipt>, Error> {
        let target = price_to_sqrt_price_x96(self.scale.to_raw(target_price))
            .map_err(|e| match e {
                Error::InvalidPriceError(_) => Error::InvalidPriceError(target_price),
                other => other,
            })?;
        let current = self.initialized_slot0()?;
        if target == current.sqrt_price_x96 {
            return Ok(None);
        }

        let zero_for_one = target < current.sqrt_price_x96;
        let token_in = if zero_for_one {
            self.token0()
        } else {
            self.token1()
        };
        let budget = self
            .env
            .balance_of(token_in.address, account)
            .map_err(self.collaborator("balance_of", Some(account)))?;
        if budget.is_zero() {
            return Err(Error::InsufficientAmountError {
                side: token_in.symbol,
            });
        }

        self.swap_base_units(zero_for_one, budget, Some(target), account)
            .map(Some)
    }
}
