// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: stderr, a daily-rolling file, and the runner log stream.

use std::io;

use rn_core::{Clock, SystemClock};
use rn_engine::SharedState;
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use super::{Config, LifecycleError};

/// File name prefix of the daemon's own log under `log_dir`.
pub const LOG_FILE_PREFIX: &str = "rnd.log";

/// Modules serving pulls. Their debug output stays out of the runner log,
/// which those pulls return.
const CONNECTION_TARGETS: &[&str] = &["rn_daemon::listener", "rn_daemon::protocol"];

/// Appends each formatted tracing line to the executor's runner log.
///
/// The history lock is taken per line, so nothing may log while holding it.
pub struct RunnerLogWriter<C: Clock = SystemClock> {
    state: SharedState<C>,
}

impl<C: Clock> RunnerLogWriter<C> {
    pub fn new(state: SharedState<C>) -> Self {
        Self { state }
    }
}

impl<C: Clock> io::Write for RunnerLogWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.is_empty() {
            self.state.push_runner_log(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a, C: Clock> MakeWriter<'a> for RunnerLogWriter<C> {
    type Writer = RunnerLogWriter<C>;

    fn make_writer(&'a self) -> Self::Writer {
        RunnerLogWriter { state: self.state.clone() }
    }
}

/// Whether an event goes to the runner log stream.
///
/// Connection handling is forwarded at info and above only.
pub fn forwarded_to_runner_log(meta: &Metadata<'_>) -> bool {
    *meta.level() <= Level::INFO
        || !CONNECTION_TARGETS.iter().any(|target| meta.target().starts_with(target))
}

/// Formatting layer appending to the runner log of `state`.
pub fn runner_log_layer<S, C>(state: SharedState<C>) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    C: Clock,
{
    tracing_subscriber::fmt::layer()
        .with_writer(RunnerLogWriter::new(state))
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter_fn(forwarded_to_runner_log))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the life of the process.
pub fn init_logging(config: &Config, state: SharedState) -> Result<WorkerGuard, LifecycleError> {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|e| {
        eprintln!("invalid RN_LOG {:?}: {e}, using info", config.log_filter);
        EnvFilter::new("info")
    });

    std::fs::create_dir_all(&config.log_dir)?;
    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(runner_log_layer(state))
        .try_init()
        .map_err(|e| LifecycleError::Logging(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
