//! Collateralized lending on top of a pool's price.
//!
//! A [`LendingEngine`] fronts one deployed lending pool. Collateral is
//! valued at the paired pool's current price, which the engine pushes to
//! the facility before every call that depends on it.

use crate::catalog::Token;
use crate::config::LendingDefinition;
use crate::FastSet;
use crate::env::{BPS, ContractEnv, EnvError, LendingParams, Revert, WAD};
use crate::error::Error;
use crate::math::math_helpers::{f64_to_u256, mul_div_rounding_up, u256_to_f64};
use crate::pool::PoolHandle;
use alloy_primitives::{Address, U256};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Loan record as the facility stores it.
///
/// Amounts are base units, unlike every other lending read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanInformation {
    pub collateral: U256,
    pub debt: U256,
    pub is_active: bool,
}

/// Where an account is in the loan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    NoLoan,
    Collateralized,
    Borrowed,
    /// Collateral and debt back to zero after earlier activity.
    Closed,
}

pub struct LendingEngine<E> {
    definition: LendingDefinition,
    pool: PoolHandle<E>,
    address: Address,
    operator: Address,
    price_override: RwLock<Option<f64>>,
    /// Accounts that ever posted collateral or borrowed, to tell a closed
    /// loan from no loan.
    participants: Mutex<FastSet<Address>>,
}

impl<E> std::fmt::Debug for LendingEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LendingEngine")
            .field("pool", &self.definition.pool)
            .field("address", &self.address)
            .field("collateral", &self.definition.collateral.symbol)
            .field("lending", &self.definition.lending.symbol)
            .finish()
    }
}

impl<E: ContractEnv> LendingEngine<E> {
    /// Deploys the facility, funds it with the bootstrap capital and
    /// publishes the pool's current price.
    pub fn deploy(
        pool: PoolHandle<E>,
        definition: LendingDefinition,
        operator: Address,
    ) -> Result<Self, Error> {
        let env = pool.env().clone();
        let capital = definition.lending_capital;

        let wrap = |operation: &'static str| {
            let name = definition.pool.clone();
            move |source: EnvError| Error::collaborator(operation, Some(operator), name, source)
        };
        let address = env
            .deploy_lending_pool(
                operator,
                LendingParams {
                    collateral_token: definition.collateral.address,
                    lending_token: definition.lending.address,
                    collateral_ratio_bps: definition.collateral_ratio_bps,
                },
            )
            .map_err(wrap("deploy_lending_pool"))?;

        if !capital.is_zero() {
            env.mint_token(definition.lending.address, operator, capital)
                .map_err(wrap("mint_tokens"))?;
            env.supply_lending_token(operator, address, capital)
                .map_err(wrap("supply_lending_token"))?;
        }

        let engine = Self::attach(pool, definition, address, operator);
        engine.push_price()?;
        info!(
            lending = %engine.definition.pool,
            %address,
            collateral = engine.definition.collateral.symbol,
            lending_token = engine.definition.lending.symbol,
            ratio_bps = engine.definition.collateral_ratio_bps,
            "lending facility deployed"
        );
        Ok(engine)
    }

    /// Fronts a facility already deployed at `address` and priced by
    /// `operator`. Nothing is sent to the environment.
    pub fn attach(
        pool: PoolHandle<E>,
        definition: LendingDefinition,
        address: Address,
        operator: Address,
    ) -> Self {
        Self {
            definition,
            pool,
            address,
            operator,
            price_override: RwLock::new(None),
            participants: Mutex::new(FastSet::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.pool
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn definition(&self) -> &LendingDefinition {
        &self.definition
    }

    pub fn pool(&self) -> &PoolHandle<E> {
        &self.pool
    }

    pub fn collateral_token(&self) -> &Token {
        &self.definition.collateral
    }

    pub fn lending_token(&self) -> &Token {
        &self.definition.lending
    }

    fn env(&self) -> &E {
        self.pool.env()
    }

    fn collaborator(
        &self,
        operation: &'static str,
        account: Option<Address>,
    ) -> impl FnOnce(EnvError) -> Error + '_ {
        move |source| {
            warn!(lending = %self.definition.pool, operation, ?account, error = %source, "lending call rejected");
            Error::collaborator(operation, account, self.definition.pool.clone(), source)
        }
    }

    /// Replaces the pool price with a fixed rate until cleared.
    pub fn set_price_override(&self, lending_per_collateral: f64) -> Result<(), Error> {
        if !lending_per_collateral.is_finite() || lending_per_collateral <= 0.0 {
            return Err(Error::InvalidPriceError(lending_per_collateral));
        }
        *self.price_override.write() = Some(lending_per_collateral);
        Ok(())
    }

    pub fn clear_price_override(&self) {
        *self.price_override.write() = None;
    }

    /// Lending tokens one collateral token is worth, in whole tokens.
    pub fn rate(&self) -> Result<f64, Error> {
        if let Some(rate) = *self.price_override.read() {
            return Ok(rate);
        }
        let rates = self.pool.exchange_rates()?;
        Ok(if self.definition.collateral == *self.pool.token0() {
            rates.token1_per_token0
        } else {
            rates.token0_per_token1
        })
    }

    fn wad_scale(&self) -> f64 {
        let shift = self.definition.lending.decimals as i32
            - self.definition.collateral.decimals as i32
            + 18;
        10f64.powi(shift)
    }

    /// Current rate as the facility stores it.
    fn price_wad(&self) -> Result<U256, Error> {
        let rate = self.rate()?;
        match f64_to_u256(rate * self.wad_scale()) {
            Some(price) if !price.is_zero() => Ok(price),
            _ => Err(Error::InvalidPriceError(rate)),
        }
    }

    fn push_price(&self) -> Result<(), Error> {
        let rate = self.rate()?;
        let price_wad = self.price_wad()?;
        debug!(lending = %self.definition.pool, rate, %price_wad, "push collateral price");
        self.env()
            .set_collateral_price(self.operator, self.address, price_wad)
            .map_err(self.collaborator("set_collateral_price", Some(self.operator)))
    }

    fn check_amount(amount: f64) -> Result<(), Error> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidAmountError(amount));
        }
        Ok(())
    }

    /// Collateral needed to borrow `borrow_amount` lending tokens at the
    /// current rate and the facility's collateral ratio, that is
    /// `borrow_amount / rate * ratio`.
    ///
    /// The quote uses the price the next borrow publishes and rounds up, so
    /// posting exactly this much covers the loan.
    pub fn collateral_required(&self, borrow_amount: f64) -> Result<f64, Error> {
        let converter = self.pool.converter();
        let debt = converter.to_base_units(&self.definition.lending, borrow_amount)?;
        let price_wad = self.price_wad()?;

        let ratio = U256::from(self.definition.collateral_ratio_bps);
        let value = mul_div_rounding_up(debt, ratio, BPS)?;
        let collateral = mul_div_rounding_up(value, WAD, price_wad)?;
        Ok(converter.to_decimal_ceil(&self.definition.collateral, collateral))
    }

    pub fn provide_collateral(&self, amount: f64, account: Address) -> Result<(), Error> {
        Self::check_amount(amount)?;
        let base = self
            .pool
            .converter()
            .to_base_units(&self.definition.collateral, amount)?;
        self.env()
            .supply_collateral(account, self.address, base)
            .map_err(self.collaborator("supply_collateral", Some(account)))?;
        self.participants.lock().insert(account);
        debug!(lending = %self.definition.pool, %account, %base, "collateral provided");
        Ok(())
    }

    /// Borrows against posted collateral at the pool's current price.
    pub fn borrow(&self, amount: f64, account: Address) -> Result<(), Error> {
        Self::check_amount(amount)?;
        let base = self
            .pool
            .converter()
            .to_base_units(&self.definition.lending, amount)?;
        self.push_price()?;

        match self.env().borrow(account, self.address, base) {
            Ok(()) => {
                self.participants.lock().insert(account);
                debug!(lending = %self.definition.pool, %account, %base, "borrowed");
                Ok(())
            }
            Err(EnvError::Reverted(Revert::InsufficientCollateral)) => {
                warn!(lending = %self.definition.pool, %account, amount, "borrow not covered");
                Err(Error::UndercollateralizedError {
                    lending: self.definition.pool.clone(),
                    account,
                    amount,
                })
            }
            Err(source) => Err(self.collaborator("borrow", Some(account))(source)),
        }
    }

    pub fn repay(&self, amount: f64, account: Address) -> Result<(), Error> {
        Self::check_amount(amount)?;
        let base = self
            .pool
            .converter()
            .to_base_units(&self.definition.lending, amount)?;
        self.env()
            .repay(account, self.address, base)
            .map_err(self.collaborator("repay", Some(account)))?;
        debug!(lending = %self.definition.pool, %account, %base, "repaid");
        Ok(())
    }

    /// Takes collateral back, provided what remains still covers the debt.
    pub fn withdraw_collateral(&self, amount: f64, account: Address) -> Result<(), Error> {
        Self::check_amount(amount)?;
        let base = self
            .pool
            .converter()
            .to_base_units(&self.definition.collateral, amount)?;
        self.push_price()?;

        match self.env().withdraw_collateral(account, self.address, base) {
            Ok(()) => {
                debug!(lending = %self.definition.pool, %account, %base, "collateral withdrawn");
                Ok(())
            }
            Err(EnvError::Reverted(Revert::OutstandingDebt)) => {
                warn!(lending = %self.definition.pool, %account, amount, "withdrawal blocked by debt");
                Err(Error::ActiveDebtError {
                    lending: self.definition.pool.clone(),
                    account,
                })
            }
            Err(source) => Err(self.collaborator("withdraw_collateral", Some(account))(source)),
        }
    }

    /// Collateral and debt in base units, verbatim from the facility.
    pub fn loan_information(&self, account: Address) -> Result<LoanInformation, Error> {
        let record = self
            .env()
            .loan(self.address, account)
            .map_err(self.collaborator("loan", Some(account)))?;
        Ok(LoanInformation {
            collateral: record.collateral,
            debt: record.debt,
            is_active: record.is_active(),
        })
    }

    pub fn loan_state(&self, account: Address) -> Result<LoanState, Error> {
        let info = self.loan_information(account)?;
        Ok(if !info.debt.is_zero() {
            LoanState::Borrowed
        } else if !info.collateral.is_zero() {
            LoanState::Collateralized
        } else if self.participants.lock().contains(&account) {
            LoanState::Closed
        } else {
            LoanState::NoLoan
        })
    }

    /// Whether the account owes anything.
    pub fn is_active_loan(&self, account: Address) -> Result<bool, Error> {
        Ok(!self.loan_information(account)?.debt.is_zero())
    }

    /// Whether the facility considers the loan covered once the current
    /// rate is published.
    pub fn is_loan_healthy(&self, account: Address) -> Result<bool, Error> {
        self.push_price()?;
        let record = self
            .env()
            .loan(self.address, account)
            .map_err(self.collaborator("loan", Some(account)))?;
        Ok(record.is_healthy)
    }

    /// Repays `borrower`'s unhealthy loan from `liquidator`'s balance in
    /// exchange for its collateral. Healthy loans are refused by the
    /// facility.
    pub fn liquidate_loan(&self, borrower: Address, liquidator: Address) -> Result<(), Error> {
        self.push_price()?;
        self.env()
            .liquidate(liquidator, self.address, borrower)
            .map_err(self.collaborator("liquidate", Some(liquidator)))?;
        info!(lending = %self.definition.pool, %borrower, %liquidator, "loan liquidated");
        Ok(())
    }

    /// Lending tokens the facility can still lend out.
    pub fn available_to_lend(&self) -> Result<f64, Error> {
        let base = self
            .env()
            .available_to_lend(self.address)
            .map_err(self.collaborator("available_to_lend", None))?;
        Ok(self
            .pool
            .converter()
            .to_decimal(&self.definition.lending, base))
    }

    /// Price last published to the facility, lending per collateral token.
    pub fn collateral_price(&self) -> Result<f64, Error> {
        let wad = self
            .env()
            .collateral_price(self.address)
            .map_err(self.collaborator("collateral_price", None))?;
        Ok(u256_to_f64(wad) / self.wad_scale())
    }

    fn mint(&self, token: &Token, amount: f64, account: Address) -> Result<(), Error> {
        let base = self.pool.converter().to_base_units(token, amount)?;
        if base.is_zero() {
            return Ok(());
        }
        self.env()
            .mint_token(token.address, account, base)
            .map_err(self.collaborator("mint_tokens", Some(account)))
    }

    pub fn mint_collateral_token(&self, amount: f64, account: Address) -> Result<(), Error> {
        self.mint(&self.definition.collateral, amount, account)
    }

    pub fn mint_lending_token(&self, amount: f64, account: Address) -> Result<(), Error> {
        self.mint(&self.definition.lending, amount, account)
    }

    fn balance(&self, token: &Token, account: Address) -> Result<f64, Error> {
        let base = self
            .env()
            .balance_of(token.address, account)
            .map_err(self.collaborator("balance_of", Some(account)))?;
        Ok(self.pool.converter().to_decimal(token, base))
    }

    pub fn collateral_token_balance(&self, account: Address) -> Result<f64, Error> {
        self.balance(&self.definition.collateral, account)
    }

    pub fn lending_token_balance(&self, account: Address) -> Result<f64, Error> {
        self.balance(&self.definition.lending, account)
    }
}
