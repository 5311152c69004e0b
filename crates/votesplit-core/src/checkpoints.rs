//! Append-only checkpoint history.
//!
//! A `Trace` is one key's history of `(time, value)` records; `CheckpointStore` is an arena of
//! traces indexed by a stable slot per key (one per delegatee plus one for total supply).
//!
//! Invariants:
//! - Times inside a trace are non-decreasing; only the last record is ever overwritten, and only
//!   by a write carrying the same time.
//! - Writes across the whole store are driven by one clock: a write older than the last write
//!   anywhere in the store is a defect and panics.

use crate::reconcile::VoteDelta;
use crate::{Address, Balance, Result, Timepoint, VotesError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `(time, value)` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub time: Timepoint,
    pub value: Balance,
}

/// One key's checkpoint history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    checkpoints: Vec<Checkpoint>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn at(&self, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.get(pos).copied()
    }

    /// Latest value, or 0 for an empty trace.
    pub fn latest(&self) -> Balance {
        self.checkpoints.last().map_or(0, |c| c.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    /// Record `value` at `time`, returning `(previous latest, value)`.
    ///
    /// Panics if `time` precedes the last record.
    pub fn push(&mut self, time: Timepoint, value: Balance) -> (Balance, Balance) {
        match self.checkpoints.last_mut() {
            Some(last) if last.time == time => {
                let old = last.value;
                last.value = value;
                (old, value)
            }
            Some(last) => {
                assert!(
                    last.time < time,
                    "invariant violated: checkpoint time {time} precedes last {}",
                    last.time
                );
                let old = last.value;
                self.checkpoints.push(Checkpoint { time, value });
                (old, value)
            }
            None => {
                self.checkpoints.push(Checkpoint { time, value });
                (0, value)
            }
        }
    }

    /// Value at the greatest checkpoint time `<= time`, or 0 if there is none.
    pub fn upper_lookup(&self, time: Timepoint) -> Balance {
        self.value_before(self.upper_bound(time, 0, self.checkpoints.len()))
    }

    /// Same result as [`Trace::upper_lookup`], tuned for lookups near the end of the trace.
    ///
    /// Long traces test `len - sqrt(len)` first and binary-search only the side that can hold
    /// the answer.
    pub fn upper_lookup_recent(&self, time: Timepoint) -> Balance {
        let len = self.checkpoints.len();
        let mut low = 0;
        let mut high = len;

        if len > 5 {
            let mid = len - isqrt(len);
            if time < self.checkpoints[mid].time {
                high = mid;
            } else {
                low = mid + 1;
            }
        }

        self.value_before(self.upper_bound(time, low, high))
    }

    /// Index of the first checkpoint in `[low, high)` whose time is `> time`.
    fn upper_bound(&self, time: Timepoint, low: usize, high: usize) -> usize {
        low + self.checkpoints[low..high].partition_point(|c| c.time <= time)
    }

    fn value_before(&self, pos: usize) -> Balance {
        pos.checked_sub(1).map_or(0, |p| self.checkpoints[p].value)
    }
}

fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Key of a trace in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraceKey {
    TotalSupply,
    Delegatee(Address),
}

/// Arena of checkpoint traces.
#[derive(Clone, Debug, Default)]
pub struct CheckpointStore {
    slots: BTreeMap<TraceKey, usize>,
    traces: Vec<Trace>,
    last_time: Option<Timepoint>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace(&self, key: &TraceKey) -> Option<&Trace> {
        self.slots.get(key).map(|&slot| &self.traces[slot])
    }

    fn trace_mut(&mut self, key: TraceKey) -> &mut Trace {
        let next = self.traces.len();
        let slot = *self.slots.entry(key).or_insert(next);
        if slot == next {
            self.traces.push(Trace::new());
        }
        &mut self.traces[slot]
    }

    /// Latest value for `key` (0 if it has no checkpoints).
    pub fn latest(&self, key: &TraceKey) -> Balance {
        self.trace(key).map_or(0, Trace::latest)
    }

    /// Value of `key` as of `time`.
    ///
    /// Fails with `FutureLookup` unless `time < now`: the value at the current timepoint can
    /// still change.
    pub fn value_at(&self, key: &TraceKey, time: Timepoint, now: Timepoint) -> Result<Balance> {
        if time >= now {
            return Err(VotesError::FutureLookup { time, current: now });
        }
        Ok(self.trace(key).map_or(0, |t| t.upper_lookup_recent(time)))
    }

    /// Record `value` for `key` at `time`, returning `(old, new)`.
    ///
    /// Panics if `time` is older than the last write anywhere in the store.
    pub fn push(&mut self, key: TraceKey, time: Timepoint, value: Balance) -> (Balance, Balance) {
        if let Some(last) = self.last_time {
            assert!(
                time >= last,
                "invariant violated: checkpoint time {time} precedes store time {last}"
            );
        }
        self.last_time = Some(time);
        self.trace_mut(key).push(time, value)
    }

    /// `push(key, time, latest(key) ± delta)`.
    ///
    /// Panics on underflow or overflow: either means reconciliation produced a bad delta.
    pub fn apply_delta(
        &mut self,
        key: TraceKey,
        time: Timepoint,
        delta: VoteDelta,
    ) -> (Balance, Balance) {
        let current = self.latest(&key);
        let next = delta.apply_to(current).unwrap_or_else(|| {
            panic!("invariant violated: applying {delta:?} to {key:?} at value {current}")
        });
        self.push(key, time, next)
    }

    pub fn num_checkpoints(&self, key: &TraceKey) -> usize {
        self.trace(key).map_or(0, Trace::len)
    }

    pub fn checkpoint(&self, key: &TraceKey, pos: usize) -> Option<Checkpoint> {
        self.trace(key).and_then(|t| t.at(pos))
    }

    /// Keys that have at least one checkpoint, in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &TraceKey> {
        self.slots.keys()
    }

    /// Delegatees that have at least one checkpoint, in ascending order.
    pub fn delegatees(&self) -> impl Iterator<Item = Address> + '_ {
        self.slots.keys().filter_map(|k| match k {
            TraceKey::Delegatee(a) => Some(*a),
            TraceKey::TotalSupply => None,
        })
    }

    pub fn last_time(&self) -> Option<Timepoint> {
        self.last_time
    }
}
