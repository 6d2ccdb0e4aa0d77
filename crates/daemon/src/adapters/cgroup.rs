// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource usage from the cgroup v2 interface files.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rn_engine::{MetricsCollector, MetricsError, SystemMetrics};

pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Reads `cpu.stat`, `memory.current` and `memory.stat` under a cgroup dir.
#[derive(Debug, Clone)]
pub struct CgroupMetrics {
    root: PathBuf,
}

impl CgroupMetrics {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, name: &str) -> Result<(String, String), MetricsError> {
        let path = self.root.join(name);
        let display = path.display().to_string();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok((display, contents)),
            Err(source) => Err(MetricsError::Read { path: display, source }),
        }
    }
}

impl Default for CgroupMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_CGROUP_ROOT)
    }
}

impl MetricsCollector for CgroupMetrics {
    fn system_metrics(&self) -> Result<SystemMetrics, MetricsError> {
        let (path, cpu_stat) = self.read("cpu.stat")?;
        let cpu_usage_micro = stat_value(&path, &cpu_stat, "usage_usec")?;

        let (path, current) = self.read("memory.current")?;
        let memory_usage_bytes = parse_u64(&path, current.trim())?;

        let (path, memory_stat) = self.read("memory.stat")?;
        let inactive_file = stat_value(&path, &memory_stat, "inactive_file")?;

        Ok(SystemMetrics {
            timestamp_micro: now_micros(),
            cpu_usage_micro,
            memory_usage_bytes,
            memory_working_set_bytes: memory_usage_bytes.saturating_sub(inactive_file),
            gpus: Vec::new(),
        })
    }
}

/// Value of `key` in a flat-keyed cgroup file (`key value` per line).
fn stat_value(path: &str, contents: &str, key: &str) -> Result<u64, MetricsError> {
    let value = contents
        .lines()
        .filter_map(|line| line.split_once(' '))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.trim())
        .ok_or_else(|| MetricsError::Parse { path: path.to_string(), message: format!("missing {key}") })?;
    parse_u64(path, value)
}

fn parse_u64(path: &str, value: &str) -> Result<u64, MetricsError> {
    value.parse().map_err(|e| MetricsError::Parse {
        path: path.to_string(),
        message: format!("{value:?}: {e}"),
    })
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// True if `root` looks like a cgroup v2 directory.
pub fn is_cgroup_v2(root: &Path) -> bool {
    root.join("cgroup.controllers").exists()
}

#[cfg(test)]
#[path = "cgroup_tests.rs"]
mod tests;
