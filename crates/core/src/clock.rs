// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so event ordering can be tested without sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeTime>>,
}

#[derive(Debug)]
struct FakeTime {
    now: Instant,
    epoch_ms: u64,
}

impl FakeClock {
    /// A clock whose wall time starts at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::at_epoch_ms(1_704_067_200_000)
    }

    pub fn at_epoch_ms(epoch_ms: u64) -> Self {
        Self { inner: Arc::new(Mutex::new(FakeTime { now: Instant::now(), epoch_ms })) }
    }

    /// Move both the monotonic and the wall clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut t = self.inner.lock();
        t.now += duration;
        t.epoch_ms += duration.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
