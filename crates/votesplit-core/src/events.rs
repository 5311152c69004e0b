//! Change notifications returned by each engine operation, in emission order.

use crate::{Address, Balance, Delegation};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VotesEvent {
    /// Full old and new sets; observers diff them themselves.
    DelegationSetChanged {
        account: Address,
        old: Vec<Delegation>,
        new: Vec<Delegation>,
    },
    /// One per delegatee checkpoint actually written.
    VotingPowerChanged {
        delegatee: Address,
        old: Balance,
        new: Balance,
    },
    TotalSupplyChanged {
        old: Balance,
        new: Balance,
    },
}

impl VotesEvent {
    pub fn is_voting_power_change(&self) -> bool {
        matches!(self, VotesEvent::VotingPowerChanged { .. })
    }
}
