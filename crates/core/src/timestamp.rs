// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordering key shared by every observable event of one executor.
//!
//! Values look like epoch milliseconds but are built from whole seconds
//! elapsed since construction plus an in-second counter, so they stay
//! strictly increasing on hosts whose clock only has 1s precision.

use parking_lot::Mutex;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};

/// Largest in-second counter value. Past this, ticks repeat until the next second.
pub const MAX_TICKS_PER_SECOND: i64 = 999;

/// A produced timestamp value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub value: i64,
    /// True only for the first tick that hit the counter cap within a second.
    pub saturated: bool,
}

#[derive(Debug)]
struct Counter {
    second: Option<u64>,
    count: i64,
    saturated: bool,
    latest: i64,
}

/// Strictly increasing (up to saturation) event sequence numbers.
#[derive(Debug)]
pub struct MonotonicTimestamp<C: Clock = SystemClock> {
    clock: C,
    start: Instant,
    base_secs: i64,
    counter: Mutex<Counter>,
}

impl MonotonicTimestamp<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MonotonicTimestamp<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MonotonicTimestamp<C> {
    pub fn with_clock(clock: C) -> Self {
        let start = clock.now();
        let base_secs = (clock.epoch_ms() / 1000) as i64;
        Self {
            clock,
            start,
            base_secs,
            counter: Mutex::new(Counter { second: None, count: 0, saturated: false, latest: 0 }),
        }
    }

    /// Advance and return the next value.
    ///
    /// Logs a warning the first time the counter saturates within a second.
    /// Callers holding a lock that the log sink also takes should use
    /// [`MonotonicTimestamp::next_tick`] and warn after releasing it.
    pub fn next(&self) -> i64 {
        let tick = self.next_tick();
        if tick.saturated {
            warn_saturated(tick.value);
        }
        tick.value
    }

    /// Advance without logging.
    pub fn next_tick(&self) -> Tick {
        let mut c = self.counter.lock();
        // Read the clock under the lock so concurrent callers observe seconds in order.
        let second = self.clock.now().saturating_duration_since(self.start).as_secs();
        let mut saturated = false;
        match c.second {
            Some(prev) if prev >= second => {
                if c.count < MAX_TICKS_PER_SECOND {
                    c.count += 1;
                } else if !c.saturated {
                    c.saturated = true;
                    saturated = true;
                }
            }
            _ => {
                c.second = Some(second);
                c.count = 0;
                c.saturated = false;
            }
        }
        let elapsed = c.second.unwrap_or(second) as i64;
        c.latest = (elapsed + self.base_secs) * 1000 + c.count;
        Tick { value: c.latest, saturated }
    }

    /// Last produced value, or 0 before the first call to `next`.
    pub fn latest(&self) -> i64 {
        self.counter.lock().latest
    }
}

/// Warn that events within one second now share a timestamp.
pub fn warn_saturated(value: i64) {
    tracing::warn!(
        timestamp = value,
        limit = MAX_TICKS_PER_SECOND,
        "too many events within one second, timestamps no longer strictly increase"
    );
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
