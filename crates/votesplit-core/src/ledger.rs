//! Reference token ledger.
//!
//! `Token` is the collaborator the engine expects: it owns balances, validates every move before
//! touching state, updates balances first and then reports the move to the engine exactly once.

use crate::checkpoints::Checkpoint;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::engine::DelegationEngine;
use crate::events::VotesEvent;
use crate::query::VotingPowerQuery;
use crate::{Address, Balance, Delegation, Result, Timepoint, VotesError};
use std::collections::BTreeMap;
use tracing::debug;

/// Anything that can report an account's current balance.
pub trait BalanceSource {
    fn balance_of(&self, account: &Address) -> Balance;
}

/// In-memory balance table. Zero balances are not stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    entries: BTreeMap<Address, Balance>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, account: Address, balance: Balance) {
        if balance == 0 {
            self.entries.remove(&account);
        } else {
            self.entries.insert(account, balance);
        }
    }

    /// Non-zero balances in ascending account order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Balance)> {
        self.entries.iter()
    }

    /// Sum of all balances, `None` on overflow.
    pub fn total(&self) -> Option<Balance> {
        self.entries
            .values()
            .try_fold(0 as Balance, |acc, b| acc.checked_add(*b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BalanceSource for Balances {
    fn balance_of(&self, account: &Address) -> Balance {
        self.entries.get(account).copied().unwrap_or(0)
    }
}

/// Fungible token with partial delegation.
#[derive(Debug)]
pub struct Token<C: Clock> {
    balances: Balances,
    engine: DelegationEngine<C>,
}

impl<C: Clock> Token<C> {
    pub fn new(config: EngineConfig, clock: C) -> Result<Self> {
        Ok(Self {
            balances: Balances::new(),
            engine: DelegationEngine::new(config, clock)?,
        })
    }

    pub fn engine(&self) -> &DelegationEngine<C> {
        &self.engine
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.balances.balance_of(account)
    }

    pub fn mint(&mut self, to: Address, amount: Balance) -> Result<Vec<VotesEvent>> {
        if to.is_zero() {
            let err = VotesError::InvalidAccount("cannot mint to the zero address".into());
            return Err(self.reject("mint", err));
        }
        let cap = self.engine.config().max_supply;
        let supply = self.engine.current_total_supply();
        match supply.checked_add(amount) {
            Some(next) if next <= cap => {}
            attempted => {
                let err = VotesError::SupplyCapExceeded {
                    supply: attempted.unwrap_or(Balance::MAX),
                    cap,
                };
                return Err(self.reject("mint", err));
            }
        }
        self.move_balance("mint", Address::ZERO, to, amount)
    }

    pub fn burn(&mut self, from: Address, amount: Balance) -> Result<Vec<VotesEvent>> {
        if from.is_zero() {
            let err = VotesError::InvalidAccount("cannot burn from the zero address".into());
            return Err(self.reject("burn", err));
        }
        self.ensure_balance("burn", &from, amount)?;
        self.move_balance("burn", from, Address::ZERO, amount)
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<Vec<VotesEvent>> {
        if from.is_zero() || to.is_zero() {
            let reason = "transfers cannot involve the zero address".to_string();
            let err = VotesError::InvalidAccount(reason);
            return Err(self.reject("transfer", err));
        }
        self.ensure_balance("transfer", &from, amount)?;
        self.move_balance("transfer", from, to, amount)
    }

    /// Delegate all of `account`'s voting power to `delegatee` (`Address::ZERO` clears).
    pub fn delegate(&mut self, account: Address, delegatee: Address) -> Result<Vec<VotesEvent>> {
        let balance = self.balances.balance_of(&account);
        self.engine.delegate(account, delegatee, balance)
    }

    pub fn set_delegations(
        &mut self,
        account: Address,
        delegations: Vec<Delegation>,
    ) -> Result<Vec<VotesEvent>> {
        let balance = self.balances.balance_of(&account);
        self.engine.set_delegations(account, delegations, balance)
    }

    fn reject(&self, op: &'static str, err: VotesError) -> VotesError {
        self.engine.record_rejection(op, err)
    }

    fn ensure_balance(&self, op: &'static str, account: &Address, needed: Balance) -> Result<()> {
        let balance = self.balances.balance_of(account);
        if balance < needed {
            let err = VotesError::InsufficientBalance {
                account: *account,
                balance,
                needed,
            };
            return Err(self.reject(op, err));
        }
        Ok(())
    }

    /// Update balances, then report the move. Restores balances if the engine rejects it.
    fn move_balance(
        &mut self,
        op: &'static str,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<Vec<VotesEvent>> {
        if from == to || amount == 0 {
            return Ok(Vec::new());
        }

        let from_before = self.balances.balance_of(&from);
        let to_before = self.balances.balance_of(&to);

        if !to.is_zero() {
            let Some(credited) = to_before.checked_add(amount) else {
                let err = VotesError::InvalidInput(format!("balance of {to} overflows"));
                return Err(self.reject(op, err));
            };
            self.balances.set(to, credited);
        }
        if !from.is_zero() {
            self.balances.set(from, from_before - amount);
        }

        let (engine, balances) = (&mut self.engine, &self.balances);
        match engine.on_balance_changed(balances, from, to, amount) {
            Ok(events) => {
                debug!(%from, %to, amount = %amount, "Balance moved");
                Ok(events)
            }
            Err(err) => {
                if !from.is_zero() {
                    self.balances.set(from, from_before);
                }
                if !to.is_zero() {
                    self.balances.set(to, to_before);
                }
                Err(err)
            }
        }
    }
}

impl<C: Clock> VotingPowerQuery for Token<C> {
    fn clock(&self) -> Timepoint {
        self.engine.clock()
    }

    fn clock_mode(&self) -> &'static str {
        self.engine.clock_mode()
    }

    fn current_votes(&self, delegatee: &Address) -> Balance {
        self.engine.current_votes(delegatee)
    }

    fn votes_at(&self, delegatee: &Address, time: Timepoint) -> Result<Balance> {
        self.engine.votes_at(delegatee, time)
    }

    fn current_total_supply(&self) -> Balance {
        self.engine.current_total_supply()
    }

    fn total_supply_at(&self, time: Timepoint) -> Result<Balance> {
        self.engine.total_supply_at(time)
    }

    fn current_delegations(&self, account: &Address) -> Vec<Delegation> {
        self.engine.current_delegations(account)
    }

    fn num_checkpoints(&self, delegatee: &Address) -> usize {
        self.engine.num_checkpoints(delegatee)
    }

    fn checkpoint(&self, delegatee: &Address, pos: usize) -> Option<Checkpoint> {
        self.engine.checkpoint(delegatee, pos)
    }
}
