use crate::FastMap;
use crate::env::Revert;
use alloy_primitives::{Address, U256};

/// Balances of every token known to the chain.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: FastMap<(Address, Address), U256>,
    supply: FastMap<Address, U256>,
}

impl Ledger {
    pub fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.balances
            .get(&(token, owner))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.supply.get(&token).copied().unwrap_or(U256::ZERO)
    }

    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), Revert> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or_else(|| Revert::Math("token supply overflow".into()))?;
        self.supply.insert(token, supply);
        *self.balances.entry((token, to)).or_default() += amount;
        Ok(())
    }

    pub fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), Revert> {
        self.debit(token, from, amount)?;
        let supply = self.total_supply(token) - amount;
        self.supply.insert(token, supply);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Revert> {
        self.debit(token, from, amount)?;
        *self.balances.entry((token, to)).or_default() += amount;
        Ok(())
    }

    /// Fails unless `owner` holds at least `amount`.
    pub fn require(&self, token: Address, owner: Address, amount: U256) -> Result<(), Revert> {
        if self.balance_of(token, owner) < amount {
            return Err(Revert::InsufficientBalance);
        }
        Ok(())
    }

    fn debit(&mut self, token: Address, from: Address, amount: U256) -> Result<(), Revert> {
        self.require(token, from, amount)?;
        let balance = self.balance_of(token, from) - amount;
        if balance.is_zero() {
            self.balances.remove(&(token, from));
        } else {
            self.balances.insert((token, from), balance);
        }
        Ok(())
    }
}
