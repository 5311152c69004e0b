//! votesplit core: partial-delegation voting power accounting.
//!
//! Accounts hold a fungible balance and may split it across an ordered set of delegatees, each
//! receiving `floor(balance * share / denominator)` votes. Every change in balance or delegation
//! set is reconciled into per-delegatee checkpoint traces so that voting power and total supply can
//! be queried at any past timepoint.
//!
//! Design goals:
//! - Fail-closed validation: bad requests are rejected before any state is touched.
//! - Deterministic integer arithmetic (floor division, no floats, no intermediate overflow).
//! - One write per delegatee per operation (sorted merge-diff reconciliation).
//! - IO-free core; ledger, clock and authorization are collaborators.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod checkpoints;
pub mod clock;
pub mod config;
pub mod delegations;
pub mod distribution;
pub mod engine;
pub mod events;
pub mod hash;
pub mod invariants;
pub mod ledger;
pub mod metrics;
pub mod query;
pub mod reconcile;
pub mod shared;

pub use checkpoints::{Checkpoint, CheckpointStore, Trace, TraceKey};
pub use clock::{Clock, ManualClock, BLOCK_NUMBER_CLOCK_MODE};
pub use config::EngineConfig;
pub use delegations::{DelegationSet, DelegationSetStore};
pub use distribution::{distribute, mul_div_floor, DelegationAdjustment};
pub use engine::DelegationEngine;
pub use events::VotesEvent;
pub use invariants::{check_invariants, InvariantId, InvariantViolation};
pub use ledger::{BalanceSource, Balances, Token};
pub use query::VotingPowerQuery;
pub use reconcile::VoteDelta;
pub use shared::SharedEngine;

/// Token amount (balances, votes, supply).
pub type Balance = u128;

/// Position on the monotonic time axis (block height).
pub type Timepoint = u64;

/// 20-byte account identifier.
///
/// Ordering is bytewise; delegation sets are sorted by this order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Mint/burn source and "no delegate" sentinel.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Address whose last eight bytes are `n` (big-endian).
    pub fn from_low_u64_be(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Address(bytes)
    }

    /// Parse a 40-character hex string, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits)
            .map_err(|e| VotesError::InvalidInput(format!("invalid address hex {s:?}: {e}")))?;
        let bytes: [u8; 20] = raw.try_into().map_err(|v: Vec<u8>| {
            VotesError::InvalidInput(format!("address must be 20 bytes, got {}", v.len()))
        })?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = VotesError;

    fn from_str(s: &str) -> Result<Self> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// 32-byte hash newtype used for state commitments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// One entry of a delegation set: `share / denominator` of the delegator's balance goes to
/// `delegatee`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delegation {
    pub delegatee: Address,
    pub share: u32,
}

impl Delegation {
    pub fn new(delegatee: Address, share: u32) -> Self {
        Self { delegatee, share }
    }
}

/// Unified error type for votesplit operations.
///
/// Every variant is a caller-correctable rejection: state is unchanged when one is returned.
/// Invariant violations (reconciliation bugs) are not represented here; they panic.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VotesError {
    // Delegation set validation
    #[error("delegation share for {delegatee} is zero")]
    InvalidShareZero { delegatee: Address },

    #[error("delegation shares sum to {sum}, above denominator {denominator}")]
    ShareSumExceedsDenominator { sum: u64, denominator: u32 },

    #[error("delegation set is unsorted or repeats delegatee {delegatee}")]
    UnsortedOrDuplicate { delegatee: Address },

    #[error("delegation set has {length} entries, max is {max}")]
    LimitExceeded { length: usize, max: usize },

    // Checkpoint lookups
    #[error("lookup at timepoint {time} is not in the past (current {current})")]
    FutureLookup { time: Timepoint, current: Timepoint },

    // Ledger
    #[error("total supply {supply} would exceed cap {cap}")]
    SupplyCapExceeded { supply: Balance, cap: Balance },

    #[error("insufficient balance for {account}: has {balance}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        balance: Balance,
        needed: Balance,
    },

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    // Clock
    #[error("clock regression: requested {requested} < current {current}")]
    ClockRegression {
        requested: Timepoint,
        current: Timepoint,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("engine lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, VotesError>;
