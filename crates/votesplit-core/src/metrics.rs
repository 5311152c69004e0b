//! Engine instrumentation.
//!
//! - **Counters**: operations applied, rejections, checkpoint writes, events emitted
//! - **Gauges**: accounts with a delegation set, delegatees with a trace
//!
//! # Usage
//!
//! ```rust,ignore
//! let snapshot = engine.metrics().snapshot();
//! println!("{} checkpoint writes", snapshot.checkpoint_writes_total);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Metric Types
// =============================================================================

/// A simple counter that can only increase.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge that can go up or down.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Engine Metrics
// =============================================================================

/// Metrics collection for one engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Operations that changed state (no-ops excluded).
    pub operations_total: Counter,
    /// Operations rejected before changing state, whether by the token or the engine.
    pub rejected_total: Counter,
    pub checkpoint_writes_total: Counter,
    pub events_total: Counter,

    pub delegating_accounts: Gauge,
    pub tracked_delegatees: Gauge,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations_total: self.operations_total.get(),
            rejected_total: self.rejected_total.get(),
            checkpoint_writes_total: self.checkpoint_writes_total.get(),
            events_total: self.events_total.get(),
            delegating_accounts: self.delegating_accounts.get(),
            tracked_delegatees: self.tracked_delegatees.get(),
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub operations_total: u64,
    pub rejected_total: u64,
    pub checkpoint_writes_total: u64,
    pub events_total: u64,
    pub delegating_accounts: u64,
    pub tracked_delegatees: u64,
}
