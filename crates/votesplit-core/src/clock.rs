//! Clock collaborator.
//!
//! All checkpoint writes of one operation are stamped with a single `Clock::now()` reading, so
//! the clock must be non-decreasing for the lifetime of an engine.

use crate::{Result, Timepoint, VotesError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Clock mode descriptor for block-height clocks (ERC-6372 format).
pub const BLOCK_NUMBER_CLOCK_MODE: &str = "mode=blocknumber&from=default";

/// Source of the current timepoint.
pub trait Clock: Send + Sync {
    /// Current timepoint. Postcondition: never smaller than a previous return value.
    fn now(&self) -> Timepoint;

    /// Machine-readable description of the time axis.
    fn mode(&self) -> &'static str {
        BLOCK_NUMBER_CLOCK_MODE
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timepoint {
        (**self).now()
    }

    fn mode(&self) -> &'static str {
        (**self).mode()
    }
}

/// Externally driven block-height clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timepoint) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move forward by `blocks` and return the new timepoint.
    pub fn advance(&self, blocks: u64) -> Timepoint {
        let prev = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(blocks))
            })
            .unwrap_or_else(|t| t);
        prev.saturating_add(blocks)
    }

    /// Jump to `time`. Rejects regressions (fail-closed).
    pub fn set(&self, time: Timepoint) -> Result<()> {
        self.now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                (time >= t).then_some(time)
            })
            .map(|_| ())
            .map_err(|current| VotesError::ClockRegression {
                requested: time,
                current,
            })
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timepoint {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_forward() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.advance(5), 15);
        assert_eq!(clock.now(), 15);
    }

    #[test]
    fn set_rejects_regression() {
        let clock = ManualClock::new(10);
        clock.set(12).unwrap();
        clock.set(12).unwrap();
        let err = clock.set(11).unwrap_err();
        assert_eq!(
            err,
            VotesError::ClockRegression {
                requested: 11,
                current: 12
            }
        );
        assert_eq!(clock.now(), 12);
    }

    #[test]
    fn shared_clock_reports_block_number_mode() {
        let clock = Arc::new(ManualClock::new(1));
        let view: &dyn Clock = &clock;
        assert_eq!(view.mode(), BLOCK_NUMBER_CLOCK_MODE);
        clock.advance(1);
        assert_eq!(view.now(), 2);
    }
}
