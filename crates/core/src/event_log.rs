// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, timestamp-ordered event streams and cursor search.
//!
//! An `EventLog` has no lock of its own. The owner keeps every log of an
//! executor, and the timestamp they are stamped with, behind one lock so
//! that appends to different streams are ordered relative to each other.

use crate::clock::Clock;
use crate::timestamp::{MonotonicTimestamp, Tick};

/// An event carrying its ordering key.
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

/// A payload that becomes an event of type `T` once stamped.
pub trait IntoEvent<T> {
    fn into_event(self, timestamp: i64) -> T;
}

/// Ordered sequence of events for one stream. Never truncated.
#[derive(Debug, Clone)]
pub struct EventLog<T> {
    events: Vec<T>,
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T: Timestamped> EventLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `payload` with the next tick and append it.
    ///
    /// The payload is converted into an owned event, so callers may reuse
    /// their buffers afterwards.
    pub fn write<C: Clock>(
        &mut self,
        timestamp: &MonotonicTimestamp<C>,
        payload: impl IntoEvent<T>,
    ) -> Tick {
        let tick = timestamp.next_tick();
        self.push(payload.into_event(tick.value));
        tick
    }

    /// Append an already stamped event.
    pub fn push(&mut self, event: T) {
        debug_assert!(
            self.events.last().is_none_or(|last| last.timestamp() <= event.timestamp()),
            "events must be appended in timestamp order"
        );
        self.events.push(event);
    }

    /// Events strictly newer than `cursor`, in append order.
    pub fn after(&self, cursor: i64) -> &[T] {
        let start = first_after(&self.events, cursor);
        &self.events[start..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.events.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.events.iter()
    }
}

/// Index of the first event with `timestamp > cursor`.
///
/// `events` must be non-decreasing in timestamp. Events sharing a
/// timestamp keep their insertion order.
pub fn first_after<T: Timestamped>(events: &[T], cursor: i64) -> usize {
    events.partition_point(|e| e.timestamp() <= cursor)
}

/// Owned copy of every event strictly newer than `cursor`.
pub fn events_after<T: Timestamped + Clone>(events: &[T], cursor: i64) -> Vec<T> {
    events[first_after(events, cursor)..].to_vec()
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
