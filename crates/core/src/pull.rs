// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental history response returned to a polling controller.

use serde::{Deserialize, Serialize};

use crate::job::{JobStateEvent, LogEvent};

/// Everything recorded after the requested cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResponse {
    pub job_states: Vec<JobStateEvent>,
    pub job_logs: Vec<LogEvent>,
    pub runner_logs: Vec<LogEvent>,
    /// Latest timestamp issued so far; the next cursor to poll with.
    pub last_updated: i64,
    /// False once the runner reached its terminal phase.
    pub has_more: bool,
}

impl PullResponse {
    pub fn is_empty(&self) -> bool {
        self.job_states.is_empty() && self.job_logs.is_empty() && self.runner_logs.is_empty()
    }

    /// Every timestamp in the response, per stream, in returned order.
    pub fn timestamps(&self) -> impl Iterator<Item = i64> + '_ {
        self.job_states
            .iter()
            .map(|e| e.timestamp)
            .chain(self.job_logs.iter().map(|e| e.timestamp))
            .chain(self.runner_logs.iter().map(|e| e.timestamp))
    }
}
