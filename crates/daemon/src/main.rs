// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rnd`: runs one submitted job and serves its history to the controller.

use std::io::Write;
use std::time::{Duration, Instant};

use rn_core::{RunnerState, SystemClock};
use rn_daemon::lifecycle::{init_logging, startup};
use rn_daemon::listener::Listener;
use rn_daemon::{Config, LifecycleError, StartupResult};
use rn_engine::{JobExecutor, SharedState};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("rnd: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::load()?;
    let state = SharedState::new(SystemClock);
    let _log_guard = init_logging(&config, state.clone())?;

    let StartupResult { mut daemon, listener } = match startup(&config, state).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e);
        }
    };
    let addr = listener.local_addr()?;
    let listen_task = tokio::spawn(Listener::new(listener, daemon.listen_ctx()).run());

    // Controllers wait for this line before connecting
    let mut stdout = std::io::stdout();
    writeln!(stdout, "READY {addr}")?;
    stdout.flush()?;

    let shutdown = daemon.shutdown.clone();
    tokio::select! {
        _ = shutdown.notified() => info!("shutdown requested"),
        reason = shutdown_signal() => info!(signal = reason, "signal received"),
    }

    listen_task.abort();
    daemon.shutdown()?;
    wait_for_job(&daemon.executor, daemon.config.kill_grace + Duration::from_secs(1)).await;
    Ok(())
}

/// Resolves on SIGTERM or ctrl-c with the signal's name.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Give a cancelled job time to record its final state before exiting.
async fn wait_for_job(executor: &JobExecutor, limit: Duration) {
    let deadline = Instant::now() + limit;
    while executor.runner_state() == RunnerState::Running {
        if Instant::now() >= deadline {
            warn!("job still running at exit");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
