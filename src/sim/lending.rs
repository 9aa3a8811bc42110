use crate::FastMap;
use crate::env::{BPS, LendingParams, LoanRecord, Revert, WAD};
use crate::math::math_helpers::mul_div;
use alloy_primitives::{Address, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loan {
    pub collateral: U256,
    pub debt: U256,
}

/// Overcollateralized lending pool with an operator-set collateral price.
///
/// The pool's token balances live in the chain ledger under its own
/// address; this type only keeps loan bookkeeping.
#[derive(Debug, Clone)]
pub struct LendingPool {
    pub address: Address,
    pub operator: Address,
    pub params: LendingParams,
    /// Lending base units per collateral base unit, scaled by 1e18.
    pub price_wad: U256,
    loans: FastMap<Address, Loan>,
}

impl LendingPool {
    pub fn new(address: Address, operator: Address, params: LendingParams) -> Self {
        Self {
            address,
            operator,
            params,
            price_wad: U256::ZERO,
            loans: FastMap::default(),
        }
    }

    pub fn loan(&self, account: &Address) -> Loan {
        self.loans.get(account).copied().unwrap_or_default()
    }

    pub fn record(&self, account: &Address) -> Result<LoanRecord, Revert> {
        let loan = self.loan(account);
        Ok(LoanRecord {
            collateral: loan.collateral,
            debt: loan.debt,
            is_healthy: self.covers(loan.collateral, loan.debt)?,
        })
    }

    pub fn set_price(&mut self, caller: Address, price_wad: U256) -> Result<(), Revert> {
        if caller != self.operator {
            return Err(Revert::NotOperator);
        }
        self.price_wad = price_wad;
        Ok(())
    }

    /// `collateral * price * 10000 >= debt * ratio_bps`
    pub fn covers(&self, collateral: U256, debt: U256) -> Result<bool, Revert> {
        if debt.is_zero() {
            return Ok(true);
        }
        let overflow = || Revert::Math("collateral value overflow".into());
        let value = mul_div(collateral, self.price_wad, WAD).map_err(|_| overflow())?;
        let lhs = value.checked_mul(BPS).ok_or_else(overflow)?;
        let rhs = debt
            .checked_mul(U256::from(self.params.collateral_ratio_bps))
            .ok_or_else(overflow)?;
        Ok(lhs >= rhs)
    }

    pub fn add_collateral(&mut self, account: Address, amount: U256) {
        self.loans.entry(account).or_default().collateral += amount;
    }

    /// Checks that `amount` can leave the account's collateral.
    pub fn check_withdraw(&self, account: &Address, amount: U256) -> Result<(), Revert> {
        let loan = self.loan(account);
        if amount > loan.collateral {
            return Err(Revert::InsufficientCollateral);
        }
        if !self.covers(loan.collateral - amount, loan.debt)? {
            return Err(Revert::OutstandingDebt);
        }
        Ok(())
    }

    pub fn withdraw(&mut self, account: Address, amount: U256) -> Result<(), Revert> {
        self.check_withdraw(&account, amount)?;
        let loan = self.loans.entry(account).or_default();
        loan.collateral -= amount;
        self.prune(&account);
        Ok(())
    }

    /// Checks that the account's collateral covers its debt plus `amount`.
    pub fn check_borrow(&self, account: &Address, amount: U256) -> Result<(), Revert> {
        let loan = self.loan(account);
        let debt = loan
            .debt
            .checked_add(amount)
            .ok_or_else(|| Revert::Math("debt overflow".into()))?;
        if !self.covers(loan.collateral, debt)? {
            return Err(Revert::InsufficientCollateral);
        }
        Ok(())
    }

    pub fn borrow(&mut self, account: Address, amount: U256) -> Result<(), Revert> {
        self.check_borrow(&account, amount)?;
        self.loans.entry(account).or_default().debt += amount;
        Ok(())
    }

    pub fn check_repay(&self, account: &Address, amount: U256) -> Result<(), Revert> {
        if amount > self.loan(account).debt {
            return Err(Revert::RepayExceedsDebt);
        }
        Ok(())
    }

    pub fn repay(&mut self, account: Address, amount: U256) -> Result<(), Revert> {
        self.check_repay(&account, amount)?;
        self.loans.entry(account).or_default().debt -= amount;
        self.prune(&account);
        Ok(())
    }

    /// Unhealthy loan of `borrower` or `LoanHealthy`.
    pub fn check_liquidate(&self, borrower: &Address) -> Result<Loan, Revert> {
        let loan = self.loan(borrower);
        if loan.debt.is_zero() || self.covers(loan.collateral, loan.debt)? {
            return Err(Revert::LoanHealthy);
        }
        Ok(loan)
    }

    /// Clears the borrower's loan, returning what it held.
    pub fn close(&mut self, borrower: &Address) -> Loan {
        self.loans.remove(borrower).unwrap_or_default()
    }

    fn prune(&mut self, account: &Address) {
        if self.loans.get(account) == Some(&Loan::default()) {
            self.loans.remove(account);
        }
    }
}
