// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Everything an executor records, behind a single reader/writer lock.
//!
//! State transitions, job output, runner diagnostics and the timestamp they
//! are stamped with all live here, so a poller holding a cursor sees the
//! streams in one consistent order.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rn_core::timestamp::warn_saturated;
use rn_core::{
    Clock, EventLog, JobSpec, JobStateChange, JobStateEvent, LogEvent, MonotonicTimestamp,
    PullResponse, RepoCredentials, RunContext, RunnerState, SystemClock, Tick, Timestamped,
};

/// Approximate encoded size one pull response may reach before it is cut
/// short. Stays well under the wire protocol's frame limit.
pub const MAX_PULL_BYTES: usize = 32 * 1024 * 1024;

/// Charged per event for its JSON framing and timestamp.
const EVENT_OVERHEAD_BYTES: usize = 64;

/// Encoded size of a log event: base64 payload plus framing.
fn log_event_bytes(event: &LogEvent) -> usize {
    EVENT_OVERHEAD_BYTES + event.message.len().div_ceil(3) * 4
}

fn state_event_bytes(event: &JobStateEvent) -> usize {
    2 * EVENT_OVERHEAD_BYTES + event.termination_message.as_ref().map_or(0, String::len)
}

/// Submitted job, filled in by `set_job` and `set_code_path`.
#[derive(Debug, Default)]
pub struct Submission {
    pub spec: Option<Arc<JobSpec>>,
    pub context: Option<Arc<RunContext>>,
    /// Taken out by `run` for the preparation step only.
    pub credentials: Option<RepoCredentials>,
    pub code_path: Option<PathBuf>,
}

/// Lock-protected executor state.
#[derive(Debug)]
pub struct ExecutorState<C: Clock = SystemClock> {
    pub runner_state: RunnerState,
    pub submission: Submission,
    timestamp: MonotonicTimestamp<C>,
    job_states: EventLog<JobStateEvent>,
    job_logs: EventLog<LogEvent>,
    runner_logs: EventLog<LogEvent>,
}

impl<C: Clock> ExecutorState<C> {
    pub fn new(clock: C) -> Self {
        Self {
            runner_state: RunnerState::WaitingForSubmit,
            submission: Submission::default(),
            timestamp: MonotonicTimestamp::with_clock(clock),
            job_states: EventLog::new(),
            job_logs: EventLog::new(),
            runner_logs: EventLog::new(),
        }
    }

    /// Record a job state transition.
    pub fn push_job_state(&mut self, change: JobStateChange) -> Tick {
        self.job_states.write(&self.timestamp, change)
    }

    /// Record a chunk of job output.
    pub fn push_job_log(&mut self, chunk: &[u8]) -> Tick {
        self.job_logs.write(&self.timestamp, chunk)
    }

    /// Record a chunk of runner diagnostics.
    pub fn push_runner_log(&mut self, chunk: &[u8]) -> Tick {
        self.runner_logs.write(&self.timestamp, chunk)
    }

    pub fn job_states(&self) -> &EventLog<JobStateEvent> {
        &self.job_states
    }

    pub fn job_logs(&self) -> &EventLog<LogEvent> {
        &self.job_logs
    }

    pub fn runner_logs(&self) -> &EventLog<LogEvent> {
        &self.runner_logs
    }

    /// Copy of everything recorded after `cursor`, up to [`MAX_PULL_BYTES`].
    pub fn history(&self, cursor: i64) -> PullResponse {
        self.history_limited(cursor, MAX_PULL_BYTES)
    }

    /// Copy of the events after `cursor`, oldest first, until their encoded
    /// size would pass `max_bytes`.
    ///
    /// A cut-short response has `has_more` set and `last_updated` at its
    /// newest event, so pulling again from there continues where it ended.
    /// Events sharing a timestamp are never split across responses, and
    /// at least one timestamp's worth of events is always returned.
    pub fn history_limited(&self, cursor: i64, max_bytes: usize) -> PullResponse {
        let states = self.job_states.after(cursor);
        let job_logs = self.job_logs.after(cursor);
        let runner_logs = self.runner_logs.after(cursor);

        let (mut s, mut j, mut r) = (0, 0, 0);
        let mut used = 0usize;
        let mut newest: Option<i64> = None;
        let mut cut_short = false;
        loop {
            let next = [
                states.get(s).map(|e| (e.timestamp(), 0)),
                job_logs.get(j).map(|e| (e.timestamp(), 1)),
                runner_logs.get(r).map(|e| (e.timestamp(), 2)),
            ]
            .into_iter()
            .flatten()
            .min();
            let Some((timestamp, stream)) = next else { break };

            let size = match stream {
                0 => state_event_bytes(&states[s]),
                1 => log_event_bytes(&job_logs[j]),
                _ => log_event_bytes(&runner_logs[r]),
            };
            if newest.is_some_and(|t| t != timestamp) && used + size > max_bytes {
                cut_short = true;
                break;
            }
            used += size;
            newest = Some(timestamp);
            match stream {
                0 => s += 1,
                1 => j += 1,
                _ => r += 1,
            }
        }

        let (last_updated, has_more) = match newest {
            Some(newest) if cut_short => (newest, true),
            _ => (self.timestamp.latest(), !self.runner_state.is_terminal()),
        };
        PullResponse {
            job_states: states[..s].to_vec(),
            job_logs: job_logs[..j].to_vec(),
            runner_logs: runner_logs[..r].to_vec(),
            last_updated,
            has_more,
        }
    }
}

/// Cloneable handle to [`ExecutorState`].
///
/// `read`/`write` hand out the guard itself, so callers can take a
/// snapshot spanning several fields atomically.
#[derive(Debug)]
pub struct SharedState<C: Clock = SystemClock> {
    inner: Arc<RwLock<ExecutorState<C>>>,
}

impl<C: Clock> Clone for SharedState<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: Clock> SharedState<C> {
    pub fn new(clock: C) -> Self {
        Self { inner: Arc::new(RwLock::new(ExecutorState::new(clock))) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ExecutorState<C>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ExecutorState<C>> {
        self.inner.write()
    }

    pub fn runner_state(&self) -> RunnerState {
        self.inner.read().runner_state
    }

    pub fn history(&self, cursor: i64) -> PullResponse {
        self.inner.read().history(cursor)
    }

    pub fn push_job_log(&self, chunk: &[u8]) {
        let tick = self.inner.write().push_job_log(chunk);
        if tick.saturated {
            warn_saturated(tick.value);
        }
    }

    /// Append runner diagnostics.
    ///
    /// Called from the tracing writer, so it never logs itself.
    pub fn push_runner_log(&self, chunk: &[u8]) {
        self.inner.write().push_runner_log(chunk);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
