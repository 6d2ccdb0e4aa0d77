// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rn_core::PullResponse;
use rn_engine::SystemMetrics;
use serde::{Deserialize, Serialize};

/// Response from runner to controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Incremental history
    History(PullResponse),

    /// Resource usage
    Metrics(SystemMetrics),

    /// Runner is shutting down
    ShuttingDown,

    /// Error response
    Error { message: String },
}

impl Response {
    pub fn error(message: impl std::fmt::Display) -> Self {
        Response::Error { message: message.to_string() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
