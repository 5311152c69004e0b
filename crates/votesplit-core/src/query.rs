//! Read-only voting power interface.

use crate::checkpoints::Checkpoint;
use crate::{Address, Balance, Delegation, Result, Timepoint};

/// Voting power queries, current and historical.
///
/// Historical lookups (`*_at`) only accept timepoints strictly before `clock()`; the value at the
/// current timepoint can still change within the same block.
pub trait VotingPowerQuery {
    /// Current timepoint of the underlying clock.
    fn clock(&self) -> Timepoint;

    /// Machine-readable clock description, e.g. `mode=blocknumber&from=default`.
    fn clock_mode(&self) -> &'static str;

    fn current_votes(&self, delegatee: &Address) -> Balance;

    /// Votes of `delegatee` as of `time`. Fails with `FutureLookup` if `time >= clock()`.
    fn votes_at(&self, delegatee: &Address, time: Timepoint) -> Result<Balance>;

    fn current_total_supply(&self) -> Balance;

    /// Fails with `FutureLookup` if `time >= clock()`.
    fn total_supply_at(&self, time: Timepoint) -> Result<Balance>;

    /// Stored delegation set of `account` (empty if it never delegated).
    fn current_delegations(&self, account: &Address) -> Vec<Delegation>;

    fn num_checkpoints(&self, delegatee: &Address) -> usize;

    fn checkpoint(&self, delegatee: &Address, pos: usize) -> Option<Checkpoint>;
}
