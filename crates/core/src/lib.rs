// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rn-core: data model shared by the runner crates

pub mod macros;

pub mod bytes;
pub mod clock;
pub mod event_log;
pub mod id;
pub mod job;
pub mod pull;
pub mod spec;
pub mod timestamp;
pub mod user;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event_log::{events_after, first_after, EventLog, IntoEvent, Timestamped};
pub use id::{JobId, RunId};
pub use job::{JobState, JobStateChange, JobStateEvent, LogEvent, RunnerState, TerminationReason};
pub use pull::PullResponse;
#[cfg(any(test, feature = "test-support"))]
pub use spec::JobSpecBuilder;
pub use spec::{
    ClusterInfo, FileArchive, JobSpec, RepoCredentials, RepoSpec, RepoType, RunContext, RunSpec,
    SpecError, SubmitBody, UserSpec, DEFAULT_ENTRYPOINT,
};
pub use timestamp::{MonotonicTimestamp, Tick, MAX_TICKS_PER_SECOND};
pub use user::ResolvedUser;
