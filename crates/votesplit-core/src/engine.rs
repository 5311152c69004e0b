//! Delegation engine: turns balance moves and delegation-set replacements into the minimal set
//! of checkpoint writes.
//!
//! Both entry points follow the same shape:
//! 1. validate (fail-closed, nothing mutated on `Err`)
//! 2. distribute the affected balances before and after the change
//! 3. reconcile with one sorted merge, so each delegatee gets at most one net write
//! 4. write checkpoints at `clock.now()` and return the operation's events
//!
//! Arithmetic underflow/overflow and time regressions in step 4 are reconciliation defects and
//! panic rather than return an error.

use crate::checkpoints::{Checkpoint, CheckpointStore, TraceKey};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::delegations::{DelegationSet, DelegationSetStore};
use crate::distribution::distribute;
use crate::events::VotesEvent;
use crate::ledger::BalanceSource;
use crate::metrics::EngineMetrics;
use crate::query::VotingPowerQuery;
use crate::reconcile::{diff_adjustments, net_deltas, VoteDelta};
use crate::{Address, Balance, Delegation, Result, Timepoint, VotesError};
use tracing::{debug, warn};

/// Partial-delegation votes engine.
///
/// Single-writer: callers serialize mutations (see [`crate::SharedEngine`]). The engine keeps no
/// event history; every mutation hands its events back to the caller.
#[derive(Debug)]
pub struct DelegationEngine<C: Clock> {
    config: EngineConfig,
    clock: C,
    checkpoints: CheckpointStore,
    delegations: DelegationSetStore,
    metrics: EngineMetrics,
}

impl<C: Clock> DelegationEngine<C> {
    /// Preconditions:
    /// - `config` passes `EngineConfig::validate` (checked here, fail-closed).
    pub fn new(config: EngineConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            checkpoints: CheckpointStore::new(),
            delegations: DelegationSetStore::new(),
            metrics: EngineMetrics::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn delegation_sets(&self) -> &DelegationSetStore {
        &self.delegations
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Replace `account`'s delegation set with `delegations`.
    ///
    /// Preconditions:
    /// - `current_balance` is `account`'s balance as reported by the ledger right now.
    ///
    /// Postconditions (on `Ok`):
    /// - stored set of `account` is exactly `delegations`
    /// - returns `DelegationSetChanged` followed by one `VotingPowerChanged` per delegatee whose
    ///   votes changed, in ascending delegatee order
    pub fn set_delegations(
        &mut self,
        account: Address,
        delegations: Vec<Delegation>,
        current_balance: Balance,
    ) -> Result<Vec<VotesEvent>> {
        let result = self.apply_set_delegations(account, delegations, current_balance);
        self.record_outcome("set_delegations", result)
    }

    /// Delegate the whole balance of `account` to `delegatee`.
    ///
    /// `Address::ZERO` clears the set, which removes all voting power sourced from `account`.
    pub fn delegate(
        &mut self,
        account: Address,
        delegatee: Address,
        current_balance: Balance,
    ) -> Result<Vec<VotesEvent>> {
        let set = if delegatee.is_zero() {
            Vec::new()
        } else {
            vec![Delegation::new(delegatee, self.config.denominator)]
        };
        self.set_delegations(account, set, current_balance)
    }

    /// Account for `amount` moving from `from` to `to`.
    ///
    /// `from == Address::ZERO` is a mint, `to == Address::ZERO` a burn.
    ///
    /// Preconditions:
    /// - `ledger` already reflects the move (reports post-move balances)
    /// - called exactly once per move
    pub fn on_balance_changed(
        &mut self,
        ledger: &dyn BalanceSource,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<Vec<VotesEvent>> {
        if from == to || amount == 0 {
            return Ok(Vec::new());
        }
        let result = self.apply_balance_change(ledger, from, to, amount);
        self.record_outcome("on_balance_changed", result)
    }

    /// Count and log a rejection raised by a collaborator before it reached the engine.
    pub(crate) fn record_rejection(&self, op: &'static str, err: VotesError) -> VotesError {
        self.metrics.rejected_total.inc();
        warn!(op, error = %err, "Operation rejected");
        err
    }

    fn apply_set_delegations(
        &mut self,
        account: Address,
        delegations: Vec<Delegation>,
        current_balance: Balance,
    ) -> Result<Vec<VotesEvent>> {
        if account.is_zero() {
            let reason = "the zero address cannot delegate";
            return Err(VotesError::InvalidAccount(reason.into()));
        }
        let new_set = DelegationSet::new(delegations, &self.config)?;

        let denominator = self.config.denominator;
        let old = distribute(self.delegations.get(&account), current_balance, denominator)?;
        let new = distribute(new_set.as_slice(), current_balance, denominator)?;
        let deltas = diff_adjustments(&old, &new);

        // Validation complete; mutations start here.
        let now = self.clock.now();
        let vote_events = self.write_vote_deltas(now, &deltas);
        let new_entries = new_set.as_slice().to_vec();
        let old_set = self.delegations.replace(account, new_set);

        debug!(
            %account,
            old_len = old_set.len(),
            new_len = new_entries.len(),
            writes = vote_events.len(),
            time = now,
            "Delegation set replaced"
        );

        let mut events = Vec::with_capacity(vote_events.len() + 1);
        events.push(VotesEvent::DelegationSetChanged {
            account,
            old: old_set.into_vec(),
            new: new_entries,
        });
        events.extend(vote_events);
        Ok(events)
    }

    fn apply_balance_change(
        &mut self,
        ledger: &dyn BalanceSource,
        from: Address,
        to: Address,
        amount: Balance,
    ) -> Result<Vec<VotesEvent>> {
        let supply = self.checkpoints.latest(&TraceKey::TotalSupply);
        let new_supply = if from.is_zero() {
            let cap = self.config.max_supply;
            match supply.checked_add(amount) {
                Some(s) if s <= cap => Some(s),
                attempted => {
                    return Err(VotesError::SupplyCapExceeded {
                        supply: attempted.unwrap_or(Balance::MAX),
                        cap,
                    })
                }
            }
        } else if to.is_zero() {
            Some(supply.checked_sub(amount).unwrap_or_else(|| {
                panic!("invariant violated: burning {amount} from total supply {supply}")
            }))
        } else {
            None
        };

        let from_deltas = if from.is_zero() {
            Vec::new()
        } else {
            let after = ledger.balance_of(&from);
            let before = after.checked_add(amount).unwrap_or_else(|| {
                panic!("invariant violated: pre-move balance of {from} overflows")
            });
            self.balance_deltas(&from, before, after)?
        };

        let to_deltas = if to.is_zero() {
            Vec::new()
        } else {
            let after = ledger.balance_of(&to);
            let before = after.checked_sub(amount).unwrap_or_else(|| {
                panic!("invariant violated: {to} holds {after}, less than the {amount} received")
            });
            self.balance_deltas(&to, before, after)?
        };

        let deltas = net_deltas(&from_deltas, &to_deltas);

        // Validation complete; mutations start here.
        let now = self.clock.now();
        let mut events = Vec::with_capacity(deltas.len() + 1);
        if let Some(new_supply) = new_supply {
            let (old, new) = self.checkpoints.push(TraceKey::TotalSupply, now, new_supply);
            self.metrics.checkpoint_writes_total.inc();
            events.push(VotesEvent::TotalSupplyChanged { old, new });
        }
        let vote_events = self.write_vote_deltas(now, &deltas);

        debug!(
            %from,
            %to,
            amount = %amount,
            writes = vote_events.len(),
            time = now,
            "Balance change reconciled"
        );

        events.extend(vote_events);
        Ok(events)
    }

    /// Per-delegatee vote change when `account`'s balance goes from `before` to `after`.
    fn balance_deltas(
        &self,
        account: &Address,
        before: Balance,
        after: Balance,
    ) -> Result<Vec<(Address, VoteDelta)>> {
        let set = self.delegations.get(account);
        if set.is_empty() {
            return Ok(Vec::new());
        }
        let denominator = self.config.denominator;
        let old = distribute(set, before, denominator)?;
        let new = distribute(set, after, denominator)?;
        Ok(diff_adjustments(&old, &new))
    }

    /// Write each non-zero delta at `now`; the zero sentinel never receives votes.
    fn write_vote_deltas(
        &mut self,
        now: Timepoint,
        deltas: &[(Address, VoteDelta)],
    ) -> Vec<VotesEvent> {
        let mut events = Vec::with_capacity(deltas.len());
        for &(delegatee, delta) in deltas {
            if delegatee.is_zero() || delta.is_zero() {
                continue;
            }
            let key = TraceKey::Delegatee(delegatee);
            let (old, new) = self.checkpoints.apply_delta(key, now, delta);
            self.metrics.checkpoint_writes_total.inc();
            events.push(VotesEvent::VotingPowerChanged {
                delegatee,
                old,
                new,
            });
        }
        events
    }

    fn record_outcome(
        &self,
        op: &'static str,
        result: Result<Vec<VotesEvent>>,
    ) -> Result<Vec<VotesEvent>> {
        match result {
            Ok(events) => {
                self.metrics.operations_total.inc();
                self.metrics.events_total.inc_by(events.len() as u64);
                self.refresh_gauges();
                Ok(events)
            }
            Err(err) => Err(self.record_rejection(op, err)),
        }
    }

    fn refresh_gauges(&self) {
        let accounts = self.delegations.len() as u64;
        let delegatees = self.checkpoints.delegatees().count() as u64;
        self.metrics.delegating_accounts.set(accounts);
        self.metrics.tracked_delegatees.set(delegatees);
    }
}

impl<C: Clock> VotingPowerQuery for DelegationEngine<C> {
    fn clock(&self) -> Timepoint {
        self.clock.now()
    }

    fn clock_mode(&self) -> &'static str {
        self.clock.mode()
    }

    fn current_votes(&self, delegatee: &Address) -> Balance {
        self.checkpoints.latest(&TraceKey::Delegatee(*delegatee))
    }

    fn votes_at(&self, delegatee: &Address, time: Timepoint) -> Result<Balance> {
        let key = TraceKey::Delegatee(*delegatee);
        self.checkpoints.value_at(&key, time, self.clock.now())
    }

    fn current_total_supply(&self) -> Balance {
        self.checkpoints.latest(&TraceKey::TotalSupply)
    }

    fn total_supply_at(&self, time: Timepoint) -> Result<Balance> {
        let key = TraceKey::TotalSupply;
        self.checkpoints.value_at(&key, time, self.clock.now())
    }

    fn current_delegations(&self, account: &Address) -> Vec<Delegation> {
        self.delegations.get(account).to_vec()
    }

    fn num_checkpoints(&self, delegatee: &Address) -> usize {
        self.checkpoints.num_checkpoints(&TraceKey::Delegatee(*delegatee))
    }

    fn checkpoint(&self, delegatee: &Address, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.checkpoint(&TraceKey::Delegatee(*delegatee), pos)
    }
}
