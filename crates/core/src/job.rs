// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and runner lifecycle states, and the events recording them.

use serde::{Deserialize, Serialize};

use crate::event_log::{IntoEvent, Timestamped};

/// Phase of the runner itself, independent of the job it executes.
///
/// Strictly sequential; a runner never re-enters an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    WaitingForSubmit,
    WaitingForCode,
    WaitingForRun,
    Running,
    /// Terminal: the job finished and no more history will be produced.
    WaitingForLogsFinished,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        self == RunnerState::WaitingForLogsFinished
    }
}

crate::simple_display! {
    RunnerState {
        WaitingForSubmit => "waiting_submit",
        WaitingForCode => "waiting_code",
        WaitingForRun => "waiting_run",
        Running => "running",
        WaitingForLogsFinished => "waiting_logs_finished",
    }
}

/// Lifecycle of the user's workload.
///
/// The runner only records `Running`, `Done`, `Failed` and `Terminated`;
/// the others belong to phases driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Downloading,
    Building,
    Running,
    Uploading,
    Stopping,
    Stopped,
    Restarting,
    Terminating,
    Terminated,
    Failed,
    Done,
}

crate::simple_display! {
    JobState {
        Downloading => "downloading",
        Building => "building",
        Running => "running",
        Uploading => "uploading",
        Stopping => "stopping",
        Stopped => "stopped",
        Restarting => "restarting",
        Terminating => "terminating",
        Terminated => "terminated",
        Failed => "failed",
        Done => "done",
    }
}

/// Machine-readable reason a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    FailedToStartDueToNoCapacity,
    InterruptedByNoCapacity,
    WaitingInstanceLimitExceeded,
    WaitingRunnerLimitExceeded,
    TerminatedByUser,
    VolumeError,
    GatewayError,
    ScaledDown,
    DoneByRunner,
    AbortedByUser,
    TerminatedByServer,
    ContainerExitedWithError,
    ContainerExitedWithErrorNoCapacity,
    ExecutorError,
    MaxDurationExceeded,
}

crate::simple_display! {
    TerminationReason {
        FailedToStartDueToNoCapacity => "failed_to_start_due_to_no_capacity",
        InterruptedByNoCapacity => "interrupted_by_no_capacity",
        WaitingInstanceLimitExceeded => "waiting_instance_limit_exceeded",
        WaitingRunnerLimitExceeded => "waiting_runner_limit_exceeded",
        TerminatedByUser => "terminated_by_user",
        VolumeError => "volume_error",
        GatewayError => "gateway_error",
        ScaledDown => "scaled_down",
        DoneByRunner => "done_by_runner",
        AbortedByUser => "aborted_by_user",
        TerminatedByServer => "terminated_by_server",
        ContainerExitedWithError => "container_exited_with_error",
        ContainerExitedWithErrorNoCapacity => "container_exited_with_error_no_capacity",
        ExecutorError => "executor_error",
        MaxDurationExceeded => "max_duration_exceeded",
    }
}

/// A requested job state transition, before it is stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStateChange {
    pub state: JobState,
    pub termination_reason: Option<TerminationReason>,
    pub termination_message: Option<String>,
}

impl JobStateChange {
    pub fn new(state: JobState) -> Self {
        Self { state, termination_reason: None, termination_message: None }
    }

    pub fn with_reason(mut self, reason: TerminationReason) -> Self {
        self.termination_reason = Some(reason);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.termination_message = Some(message.into());
        self
    }
}

impl From<JobState> for JobStateChange {
    fn from(state: JobState) -> Self {
        Self::new(state)
    }
}

/// A recorded job state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStateEvent {
    pub state: JobState,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_message: Option<String>,
}

impl Timestamped for JobStateEvent {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl IntoEvent<JobStateEvent> for JobStateChange {
    fn into_event(self, timestamp: i64) -> JobStateEvent {
        JobStateEvent {
            state: self.state,
            timestamp,
            termination_reason: self.termination_reason,
            termination_message: self.termination_message,
        }
    }
}

/// One chunk of output exactly as it was written. Not split into lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(with = "crate::bytes")]
    pub message: Vec<u8>,
    pub timestamp: i64,
}

impl LogEvent {
    /// Message as text, replacing invalid UTF-8.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }
}

impl Timestamped for LogEvent {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl IntoEvent<LogEvent> for &[u8] {
    fn into_event(self, timestamp: i64) -> LogEvent {
        LogEvent { message: self.to_vec(), timestamp }
    }
}

impl IntoEvent<LogEvent> for Vec<u8> {
    fn into_event(self, timestamp: i64) -> LogEvent {
        LogEvent { message: self, timestamp }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
