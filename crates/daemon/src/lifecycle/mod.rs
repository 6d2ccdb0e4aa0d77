// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

mod logging;
mod startup;
pub use logging::{init_logging, runner_log_layer, RunnerLogWriter};
pub use startup::startup;

use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rn_engine::{JobExecutor, MetricsCollector};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::adapters::DEFAULT_CGROUP_ROOT;
use crate::env;
use crate::listener::ListenCtx;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/rn)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Directory for the daemon's own rolling log
    pub log_dir: PathBuf,
    /// Directory for per-job output logs
    pub job_log_dir: PathBuf,
    /// Directory the job's repository is prepared in
    pub working_root: PathBuf,
    /// cgroup v2 directory metrics are read from
    pub cgroup_root: PathBuf,
    pub tcp_addr: SocketAddr,
    pub auth_token: Option<String>,
    pub ipc_timeout: Duration,
    pub kill_grace: Duration,
    pub git_timeout: Duration,
    pub log_filter: String,
}

impl Config {
    /// Load configuration from the `RN_*` environment variables.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::with_state_dir(env::state_dir()?);
        config.tcp_addr = env::tcp_addr()?;
        config.auth_token = env::auth_token();
        config.ipc_timeout = env::ipc_timeout();
        config.kill_grace = env::kill_grace();
        config.git_timeout = env::git_timeout();
        config.log_filter = env::log_filter();
        Ok(config)
    }

    /// Default layout under `state_dir`, ignoring the environment.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let log_dir = state_dir.join("logs");
        Self {
            lock_path: state_dir.join("rnd.pid"),
            job_log_dir: log_dir.join("jobs"),
            log_dir,
            working_root: state_dir.join("workdir"),
            cgroup_root: PathBuf::from(DEFAULT_CGROUP_ROOT),
            tcp_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            auth_token: None,
            ipc_timeout: Duration::from_secs(5),
            kill_grace: rn_engine::DEFAULT_KILL_GRACE,
            git_timeout: Duration::from_secs(300),
            log_filter: "info".to_string(),
            state_dir,
        }
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a task.
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub executor: Arc<JobExecutor>,
    pub metrics: Arc<dyn MetricsCollector>,
    /// Notified by a `Shutdown` request
    pub shutdown: Arc<Notify>,
    pub start_time: Instant,
}

/// Result of daemon startup - the daemon state and the bound listener.
pub struct StartupResult {
    pub daemon: Daemon,
    pub listener: TcpListener,
}

impl Daemon {
    /// Context shared by every connection handler.
    pub fn listen_ctx(&self) -> Arc<ListenCtx> {
        Arc::new(ListenCtx {
            executor: Arc::clone(&self.executor),
            metrics: Arc::clone(&self.metrics),
            shutdown: Arc::clone(&self.shutdown),
            auth_token: self.config.auth_token.clone(),
            ipc_timeout: self.config.ipc_timeout,
        })
    }

    /// Shutdown the daemon: cancel the running job and remove the pid file.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!(uptime_secs = self.start_time.elapsed().as_secs(), "shutting down daemon");

        self.executor.stop();

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock is released when self.lock_file is dropped
        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid listen address: {0}")]
    InvalidAddr(String),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Failed to install logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
