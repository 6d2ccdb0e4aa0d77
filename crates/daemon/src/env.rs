// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Listener address when `RN_TCP_ADDR` is unset.
pub const DEFAULT_TCP_ADDR: &str = "127.0.0.1:10999";

/// Resolve state directory: RN_STATE_DIR > XDG_STATE_HOME/rn > ~/.local/state/rn
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("RN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rn"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/rn"))
}

/// Address the controller connects to.
pub fn tcp_addr() -> Result<SocketAddr, LifecycleError> {
    let raw = std::env::var("RN_TCP_ADDR").unwrap_or_else(|_| DEFAULT_TCP_ADDR.to_string());
    raw.parse().map_err(|_| LifecycleError::InvalidAddr(raw))
}

/// Auth token. When set, connections must open with a matching Hello.
pub fn auth_token() -> Option<String> {
    std::env::var("RN_AUTH_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Per-message read/write timeout
pub fn ipc_timeout() -> Duration {
    duration_ms("RN_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Delay between SIGTERM and SIGKILL when a job is stopped.
pub fn kill_grace() -> Duration {
    duration_ms("RN_KILL_GRACE_MS").unwrap_or(rn_engine::DEFAULT_KILL_GRACE)
}

/// Timeout for each git/tar subprocess while preparing the working directory.
pub fn git_timeout() -> Duration {
    duration_ms("RN_GIT_TIMEOUT_MS").unwrap_or(Duration::from_secs(300))
}

/// Tracing filter directives (default `info`).
pub fn log_filter() -> String {
    std::env::var("RN_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
