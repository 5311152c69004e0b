use crate::checkpoints::TraceKey;
use crate::clock::Clock;
use crate::delegations::DelegationSet;
use crate::distribution::distribute;
use crate::ledger::{BalanceSource, Token};
use crate::query::VotingPowerQuery;
use crate::{Address, Balance};
use std::collections::BTreeMap;

/// Stable identifiers for global invariants (used in tests and `--check` reports).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantId {
    /// Sum of balances differs from the latest total-supply checkpoint.
    SupplyConserved,

    /// A delegatee's latest votes differ from the sum of its delegators' distributed amounts.
    VotesMatchDelegations,

    /// A trace has checkpoints out of time order.
    TracesOrdered,

    /// Total supply is above `EngineConfig::max_supply`.
    SupplyCapped,

    /// A stored delegation set no longer passes validation.
    DelegationSetsValid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantViolation {
    pub id: InvariantId,
    pub details: String,
}

impl InvariantViolation {
    pub fn new(id: InvariantId, details: impl Into<String>) -> Self {
        Self {
            id,
            details: details.into(),
        }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.id, self.details)
    }
}

impl std::error::Error for InvariantViolation {}

/// Audit the whole token state. Returns the first violation found.
pub fn check_invariants<C: Clock>(token: &Token<C>) -> Result<(), InvariantViolation> {
    let engine = token.engine();
    let config = engine.config();
    let supply = engine.current_total_supply();

    let total = token.balances().total().ok_or_else(|| {
        InvariantViolation::new(InvariantId::SupplyConserved, "sum of balances overflows")
    })?;
    if total != supply {
        return Err(InvariantViolation::new(
            InvariantId::SupplyConserved,
            format!("balances sum to {total}, total supply is {supply}"),
        ));
    }

    if supply > config.max_supply {
        return Err(InvariantViolation::new(
            InvariantId::SupplyCapped,
            format!("total supply {supply} above cap {}", config.max_supply),
        ));
    }

    let store = engine.checkpoints();
    for key in store.keys() {
        let ordered = store
            .trace(key)
            .map(|t| {
                let times: Vec<_> = t.iter().map(|c| c.time).collect();
                times.windows(2).all(|w| w[0] < w[1])
            })
            .unwrap_or(true);
        if !ordered {
            return Err(InvariantViolation::new(
                InvariantId::TracesOrdered,
                format!("{key:?} has checkpoints out of order"),
            ));
        }
    }

    let mut expected: BTreeMap<Address, Balance> = BTreeMap::new();
    for (account, set) in engine.delegation_sets().iter() {
        DelegationSet::validate(set.as_slice(), config).map_err(|e| {
            InvariantViolation::new(
                InvariantId::DelegationSetsValid,
                format!("set of {account}: {e}"),
            )
        })?;

        let balance = token.balances().balance_of(account);
        let adjustments = distribute(set.as_slice(), balance, config.denominator).map_err(|e| {
            InvariantViolation::new(
                InvariantId::DelegationSetsValid,
                format!("set of {account}: {e}"),
            )
        })?;
        for adj in adjustments {
            if adj.delegatee.is_zero() {
                continue;
            }
            let slot = expected.entry(adj.delegatee).or_insert(0);
            *slot = slot.checked_add(adj.amount).ok_or_else(|| {
                InvariantViolation::new(
                    InvariantId::VotesMatchDelegations,
                    format!("expected votes of {} overflow", adj.delegatee),
                )
            })?;
        }
    }

    for delegatee in store.delegatees() {
        expected.entry(delegatee).or_insert(0);
    }
    for (delegatee, want) in expected {
        let have = store.latest(&TraceKey::Delegatee(delegatee));
        if have != want {
            return Err(InvariantViolation::new(
                InvariantId::VotesMatchDelegations,
                format!("{delegatee} has {have} votes, delegations imply {want}"),
            ));
        }
    }

    Ok(())
}
