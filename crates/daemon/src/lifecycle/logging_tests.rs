// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use rn_core::FakeClock;
use tracing_subscriber::layer::SubscriberExt;

use super::*;

#[test]
fn writer_appends_each_write_as_one_event() {
    let state = SharedState::new(FakeClock::new());
    let mut writer = RunnerLogWriter::new(state.clone());

    writer.write_all(b"first line\n").unwrap();
    writer.write_all(b"second line\n").unwrap();
    writer.write_all(b"").unwrap();

    let history = state.history(0);
    let lines: Vec<_> = history.runner_logs.iter().map(|e| e.text().into_owned()).collect();
    assert_eq!(lines, ["first line\n", "second line\n"]);
    assert!(history.job_logs.is_empty());
    assert!(history.runner_logs[0].timestamp < history.runner_logs[1].timestamp);
}

#[test]
fn tracing_events_reach_runner_log() {
    let state = SharedState::new(FakeClock::new());
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(RunnerLogWriter::new(state.clone()))
            .with_ansi(false)
            .with_target(false),
    );

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(job_id = "job-7", "job submitted");
    });

    let history = state.history(0);
    assert_eq!(history.runner_logs.len(), 1);
    let line = history.runner_logs[0].text().into_owned();
    assert!(line.contains("INFO"), "line: {line}");
    assert!(line.contains("job submitted"), "line: {line}");
    assert!(line.contains("job_id=\"job-7\""), "line: {line}");
    assert!(line.ends_with('\n'));
}

#[test]
fn runner_log_lines_advance_the_pull_cursor() {
    let state = SharedState::new(FakeClock::new());
    let mut writer = RunnerLogWriter::new(state.clone());

    writer.write_all(b"before\n").unwrap();
    let cursor = state.history(0).last_updated;
    writer.write_all(b"after\n").unwrap();

    let history = state.history(cursor);
    assert_eq!(history.runner_logs.len(), 1);
    assert_eq!(history.runner_logs[0].text(), "after\n");
}

#[test]
fn connection_debug_stays_out_of_runner_log() {
    let state = SharedState::new(FakeClock::new());
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(runner_log_layer(state.clone()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!(target: "rn_daemon::listener", "sending history");
        tracing::debug!(target: "rn_daemon::protocol::wire", "frame read");
        tracing::info!(target: "rn_daemon::listener", "received request");
        tracing::debug!(target: "rn_engine::process", "job process started");
    });

    let lines: Vec<_> =
        state.history(0).runner_logs.iter().map(|e| e.text().into_owned()).collect();
    assert_eq!(lines.len(), 2, "lines: {lines:?}");
    assert!(lines[0].contains("received request"));
    assert!(lines[1].contains("job process started"));
}
