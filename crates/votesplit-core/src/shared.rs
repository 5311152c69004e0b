//! Thread-safe handle around a [`Token`].
//!
//! Mutations take the write lock, so operations are applied one at a time. Queries take the read
//! lock and observe either the state before or after an operation, never a partial one.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::events::VotesEvent;
use crate::ledger::Token;
use crate::metrics::MetricsSnapshot;
use crate::query::VotingPowerQuery;
use crate::{Address, Balance, Delegation, Result, Timepoint, VotesError};
use std::sync::{Arc, RwLock};

/// Cloneable, lock-serialized token.
pub struct SharedEngine<C: Clock> {
    inner: Arc<RwLock<Token<C>>>,
}

impl<C: Clock> Clone for SharedEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SharedEngine<C> {
    pub fn new(config: EngineConfig, clock: C) -> Result<Self> {
        Ok(Self::from_token(Token::new(config, clock)?))
    }

    pub fn from_token(token: Token<C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token)),
        }
    }

    /// Run `f` under the write lock.
    pub fn write<T>(&self, f: impl FnOnce(&mut Token<C>) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().map_err(|_| VotesError::LockPoisoned)?;
        f(&mut guard)
    }

    /// Run `f` under the read lock.
    pub fn query<T>(&self, f: impl FnOnce(&Token<C>) -> T) -> Result<T> {
        let guard = self.inner.read().map_err(|_| VotesError::LockPoisoned)?;
        Ok(f(&guard))
    }

    pub fn mint(&self, to: Address, amount: Balance) -> Result<Vec<VotesEvent>> {
        self.write(|t| t.mint(to, amount))
    }

    pub fn burn(&self, from: Address, amount: Balance) -> Result<Vec<VotesEvent>> {
        self.write(|t| t.burn(from, amount))
    }

    pub fn transfer(
        &self,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<Vec<VotesEvent>> {
        self.write(|t| t.transfer(from, to, amount))
    }

    pub fn delegate(&self, account: Address, delegatee: Address) -> Result<Vec<VotesEvent>> {
        self.write(|t| t.delegate(account, delegatee))
    }

    pub fn set_delegations(
        &self,
        account: Address,
        delegations: Vec<Delegation>,
    ) -> Result<Vec<VotesEvent>> {
        self.write(|t| t.set_delegations(account, delegations))
    }

    pub fn current_votes(&self, delegatee: &Address) -> Result<Balance> {
        self.query(|t| t.current_votes(delegatee))
    }

    pub fn votes_at(&self, delegatee: &Address, time: Timepoint) -> Result<Balance> {
        self.query(|t| t.votes_at(delegatee, time))?
    }

    pub fn current_total_supply(&self) -> Result<Balance> {
        self.query(|t| t.current_total_supply())
    }

    pub fn total_supply_at(&self, time: Timepoint) -> Result<Balance> {
        self.query(|t| t.total_supply_at(time))?
    }

    pub fn metrics(&self) -> Result<MetricsSnapshot> {
        self.query(|t| t.engine().metrics().snapshot())
    }
}
