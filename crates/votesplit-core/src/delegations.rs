//! Per-account delegation sets.

use crate::config::EngineConfig;
use crate::{Address, Delegation, Result, VotesError};
use serde::Serialize;
use std::collections::BTreeMap;

/// A validated delegation set (correct-by-construction).
///
/// Invariants:
/// - at most `max_partial_delegations` entries
/// - strictly ascending by delegatee, no duplicates
/// - `Address::ZERO` only as the sole entry
/// - every share non-zero, shares sum to at most the denominator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DelegationSet(Vec<Delegation>);

impl DelegationSet {
    /// Validates `entries` against `config`.
    ///
    /// Checks run in order: length cap, ordering, shares. The first failure is returned.
    pub fn new(entries: Vec<Delegation>, config: &EngineConfig) -> Result<Self> {
        Self::validate(&entries, config)?;
        Ok(Self(entries))
    }

    pub fn validate(entries: &[Delegation], config: &EngineConfig) -> Result<()> {
        if entries.len() > config.max_partial_delegations {
            return Err(VotesError::LimitExceeded {
                length: entries.len(),
                max: config.max_partial_delegations,
            });
        }

        if entries.len() > 1 && entries[0].delegatee.is_zero() {
            return Err(VotesError::UnsortedOrDuplicate {
                delegatee: Address::ZERO,
            });
        }
        for pair in entries.windows(2) {
            if pair[1].delegatee <= pair[0].delegatee {
                return Err(VotesError::UnsortedOrDuplicate {
                    delegatee: pair[1].delegatee,
                });
            }
        }

        let mut sum: u64 = 0;
        for d in entries {
            if d.share == 0 {
                return Err(VotesError::InvalidShareZero {
                    delegatee: d.delegatee,
                });
            }
            sum = sum.saturating_add(u64::from(d.share));
        }
        if sum > u64::from(config.denominator) {
            return Err(VotesError::ShareSumExceedsDenominator {
                sum,
                denominator: config.denominator,
            });
        }

        Ok(())
    }

    pub fn as_slice(&self) -> &[Delegation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Delegation> {
        self.0
    }
}

/// Current delegation set of every account that ever delegated.
#[derive(Clone, Debug, Default)]
pub struct DelegationSetStore {
    sets: BTreeMap<Address, DelegationSet>,
}

impl DelegationSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current set of `account` (empty if it never delegated).
    pub fn get(&self, account: &Address) -> &[Delegation] {
        self.sets
            .get(account)
            .map(DelegationSet::as_slice)
            .unwrap_or_default()
    }

    /// Replace the whole set of `account`, returning the previous one.
    pub fn replace(&mut self, account: Address, set: DelegationSet) -> DelegationSet {
        self.sets.insert(account, set).unwrap_or_default()
    }

    /// Accounts with a stored set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &DelegationSet)> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
