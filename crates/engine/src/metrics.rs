// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource usage snapshot polled by the controller.
//!
//! Independent of the event history; values carry their own wall-clock
//! timestamp.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuMetrics {
    pub gpu_memory_usage_bytes: u64,
    pub gpu_util_percent: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Epoch microseconds.
    pub timestamp_micro: i64,
    pub cpu_usage_micro: u64,
    pub memory_usage_bytes: u64,
    pub memory_working_set_bytes: u64,
    #[serde(default)]
    pub gpus: Vec<GpuMetrics>,
}

pub trait MetricsCollector: Send + Sync + 'static {
    fn system_metrics(&self) -> Result<SystemMetrics, MetricsError>;
}
