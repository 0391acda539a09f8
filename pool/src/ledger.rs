//! Token ledger boundary.
//!
//! The pool only moves balances; minting and ledger internals live behind
//! [`TokenLedger`]. [`InMemoryToken`] backs tests and the local runner.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::error::{PoolError, Result};

pub trait TokenLedger {
    /// Address identifying this token.
    fn token(&self) -> Address;

    fn balance_of(&self, owner: Address) -> U256;

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()>;
}

/// Fungible token with balances held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryToken {
    address: Address,
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

impl InMemoryToken {
    pub fn new(address: Address) -> Self {
        InMemoryToken {
            address,
            ..Default::default()
        }
    }

    pub fn mint(&mut self, to: Address, amount: U256) {
        *self.balances.entry(to).or_default() += amount;
        self.total_supply += amount;
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }
}

impl TokenLedger for InMemoryToken {
    fn token(&self) -> Address {
        self.address
    }

    fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<()> {
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(PoolError::InsufficientFunds {
                owner: from,
                available,
                required: amount,
            })?;
        self.balances.insert(from, remaining);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }
}
