//! Sorted merge reconciliation.
//!
//! Both engine entry points reduce to "walk two key-sorted lists once and emit one combined
//! value per distinct key". `merge_sorted` is that walk; `diff_adjustments` and `net_deltas` are
//! its two uses.

use crate::distribution::DelegationAdjustment;
use crate::{Address, Balance};

/// Signed change to a checkpoint value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteDelta {
    Increase(Balance),
    Decrease(Balance),
}

impl VoteDelta {
    pub const ZERO: VoteDelta = VoteDelta::Increase(0);

    /// Change that takes `old` to `new`.
    pub fn between(old: Balance, new: Balance) -> Self {
        if new >= old {
            VoteDelta::Increase(new - old)
        } else {
            VoteDelta::Decrease(old - new)
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude() == 0
    }

    pub fn magnitude(&self) -> Balance {
        match *self {
            VoteDelta::Increase(v) | VoteDelta::Decrease(v) => v,
        }
    }

    /// Sum of two deltas.
    ///
    /// Panics on overflow: deltas are bounded by total supply, so overflow means a
    /// reconciliation bug.
    pub fn combine(self, other: VoteDelta) -> VoteDelta {
        use VoteDelta::*;
        match (self, other) {
            (Increase(a), Increase(b)) => Increase(
                a.checked_add(b)
                    .unwrap_or_else(|| panic!("invariant violated: delta overflow {a} + {b}")),
            ),
            (Decrease(a), Decrease(b)) => Decrease(
                a.checked_add(b)
                    .unwrap_or_else(|| panic!("invariant violated: delta overflow -{a} - {b}")),
            ),
            (Increase(a), Decrease(b)) | (Decrease(b), Increase(a)) => VoteDelta::between(b, a),
        }
    }

    /// Apply to `value`. Returns `None` on underflow or overflow.
    pub fn apply_to(self, value: Balance) -> Option<Balance> {
        match self {
            VoteDelta::Increase(v) => value.checked_add(v),
            VoteDelta::Decrease(v) => value.checked_sub(v),
        }
    }
}

/// Items that carry a sort key.
pub trait Keyed {
    type Key: Ord + Copy;

    fn key(&self) -> Self::Key;
}

impl Keyed for DelegationAdjustment {
    type Key = Address;

    fn key(&self) -> Address {
        self.delegatee
    }
}

impl<K: Ord + Copy, V> Keyed for (K, V) {
    type Key = K;

    fn key(&self) -> K {
        self.0
    }
}

/// Walk `left` and `right` (each strictly ascending by key) in one pass.
///
/// `combine` is called exactly once per distinct key with whichever sides hold it; returning
/// `None` drops the key from the output. Output is strictly ascending by key.
pub fn merge_sorted<L, R, D>(
    left: &[L],
    right: &[R],
    mut combine: impl FnMut(Option<&L>, Option<&R>) -> Option<D>,
) -> Vec<(L::Key, D)>
where
    L: Keyed,
    R: Keyed<Key = L::Key>,
{
    debug_assert!(left.windows(2).all(|w| w[0].key() < w[1].key()));
    debug_assert!(right.windows(2).all(|w| w[0].key() < w[1].key()));

    let mut out = Vec::with_capacity(left.len().max(right.len()));
    let (mut i, mut j) = (0usize, 0usize);

    while i < left.len() || j < right.len() {
        let (key, merged) = match (left.get(i), right.get(j)) {
            (Some(l), Some(r)) if l.key() == r.key() => {
                i += 1;
                j += 1;
                (l.key(), combine(Some(l), Some(r)))
            }
            (Some(l), r) if r.map_or(true, |r| l.key() < r.key()) => {
                i += 1;
                (l.key(), combine(Some(l), None))
            }
            (_, Some(r)) => {
                j += 1;
                (r.key(), combine(None, Some(r)))
            }
            (_, None) => unreachable!("loop guard keeps one side non-empty"),
        };
        if let Some(d) = merged {
            out.push((key, d));
        }
    }

    out
}

/// Per-delegatee change from `old` to `new`, dropping delegatees whose amount is unchanged.
pub fn diff_adjustments(
    old: &[DelegationAdjustment],
    new: &[DelegationAdjustment],
) -> Vec<(Address, VoteDelta)> {
    merge_sorted(old, new, |o, n| {
        let delta = VoteDelta::between(o.map_or(0, |a| a.amount), n.map_or(0, |a| a.amount));
        (!delta.is_zero()).then_some(delta)
    })
}

/// Combine two delta lists so every delegatee appears once with its net change.
pub fn net_deltas(
    left: &[(Address, VoteDelta)],
    right: &[(Address, VoteDelta)],
) -> Vec<(Address, VoteDelta)> {
    merge_sorted(left, right, |l, r| {
        let delta = match (l, r) {
            (Some((_, a)), Some((_, b))) => a.combine(*b),
            (Some((_, a)), None) => *a,
            (None, Some((_, b))) => *b,
            (None, None) => VoteDelta::ZERO,
        };
        (!delta.is_zero()).then_some(delta)
    })
}
