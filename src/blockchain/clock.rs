// src/blockchain/clock.rs
//! Time source for the authoritative store.
//!
//! Ledger timestamps are UNIX seconds, the same granularity a block timestamp
//! carries. The clock is injected so expiry can be exercised deterministically.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current ledger time in UNIX seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock backed by `chrono`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-epoch wall clocks are clamped rather than wrapped.
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually driven clock.
///
/// Used by tests and simulations to advance time past an expiry without
/// sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock {
            now: AtomicU64::new(start),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
