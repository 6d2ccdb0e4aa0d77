// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded helper subprocesses (git, tar).

use std::process::Output;
use std::time::Duration;

use rn_engine::PrepareError;
use tokio::process::Command;

/// Timeout for unpacking archives with tar.
pub const TAR_TIMEOUT: Duration = Duration::from_secs(300);

/// Run a command to completion, killing it if it outlives `timeout`.
///
/// Only spawn failures and timeouts are errors here; callers inspect the
/// exit status themselves.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, PrepareError> {
    cmd.stdin(std::process::Stdio::null()).kill_on_drop(true);
    let child = cmd.output();
    match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(PrepareError::Io { context: format!("failed to run {description}"), source }),
        Err(_) => Err(PrepareError::Timeout { command: description.to_string(), timeout }),
    }
}

/// Like [`run_with_timeout`], but a non-zero exit is an error carrying stderr.
pub async fn run_checked(
    cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, PrepareError> {
    let output = run_with_timeout(cmd, timeout, description).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => output.status.to_string(),
            trimmed => trimmed.to_string(),
        };
        return Err(PrepareError::Command { command: description.to_string(), message });
    }
    Ok(output)
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
