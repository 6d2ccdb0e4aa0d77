// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use rn_core::SubmitBody;
use serde::{Deserialize, Serialize};

/// Request from controller to runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello {
        version: String,
        /// Required when the runner has an auth token configured
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },

    /// Submit the job
    Submit { body: Box<SubmitBody> },

    /// Uploaded code artifact is in place
    SetCodePath { path: PathBuf },

    /// Start the job in the background
    Run,

    /// Everything recorded after `cursor`
    Pull {
        #[serde(default)]
        cursor: i64,
    },

    /// Terminate the running job
    Stop,

    /// Resource usage snapshot
    Metrics,

    /// Stop the runner process
    Shutdown,
}

impl Request {
    /// Requests polled frequently enough to log at debug level.
    pub fn is_poll(&self) -> bool {
        matches!(self, Request::Pull { .. } | Request::Metrics | Request::Ping)
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
