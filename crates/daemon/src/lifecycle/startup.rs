// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use rn_engine::{ExecutorConfig, JobExecutor, SharedState};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::adapters::{is_cgroup_v2, CgroupMetrics, GitRepoPreparer};

use super::{Config, Daemon, LifecycleError, StartupResult};

/// Start the daemon, recording into `state`.
pub async fn startup(config: &Config, state: SharedState) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, state).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // The pid file belongs to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config, state: SharedState) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Not truncated until the lock is held
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::create_dir_all(&config.log_dir)?;
    std::fs::create_dir_all(&config.job_log_dir)?;
    std::fs::create_dir_all(&config.working_root)?;

    if !is_cgroup_v2(&config.cgroup_root) {
        warn!(root = %config.cgroup_root.display(), "no cgroup v2 hierarchy, metrics unavailable");
    }
    let preparer = Arc::new(GitRepoPreparer::new(config.git_timeout));
    let executor_config = ExecutorConfig::new(&config.working_root, &config.job_log_dir)
        .kill_grace(config.kill_grace);
    let executor = Arc::new(JobExecutor::new(state, executor_config, preparer));

    // Bound last so a failed startup never accepts connections
    let listener = TcpListener::bind(config.tcp_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.tcp_addr, e))?;

    info!(
        addr = %listener.local_addr().unwrap_or(config.tcp_addr),
        state_dir = %config.state_dir.display(),
        auth = config.auth_token.is_some(),
        "daemon started"
    );

    Ok(StartupResult {
        daemon: Daemon {
            config: config.clone(),
            lock_file,
            executor,
            metrics: Arc::new(CgroupMetrics::new(&config.cgroup_root)),
            shutdown: Arc::new(Notify::new()),
            start_time: Instant::now(),
        },
        listener,
    })
}

/// Remove the pid file written by a failed startup.
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
