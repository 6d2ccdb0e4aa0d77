// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs
//!
//! Verify startup, the single-instance lock, and shutdown paths.

use std::process::Command;

use crate::prelude::*;

#[test]
fn daemon_prints_ready_and_answers_ping() {
    let runner = Runner::start();

    assert_eq!(runner.call(Request::Ping), Response::Pong);
    let pid = std::fs::read_to_string(runner.state_dir().join("rnd.pid")).unwrap();
    assert_eq!(pid.trim(), runner.pid().to_string());
}

#[test]
fn second_daemon_on_same_state_dir_fails() {
    let runner = Runner::start();

    let assert = assert_cmd::Command::new(rnd_path())
        .env("RN_STATE_DIR", runner.state_dir())
        .env("RN_TCP_ADDR", "127.0.0.1:0")
        .env_remove("RN_AUTH_TOKEN")
        .assert()
        .failure();

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.contains("daemon already running"), "stderr: {stderr}");
    assert_eq!(runner.call(Request::Ping), Response::Pong);
}

#[test]
fn invalid_listen_address_fails_startup() {
    let state_dir = tempfile::TempDir::new().unwrap();

    let assert = assert_cmd::Command::new(rnd_path())
        .env("RN_STATE_DIR", state_dir.path())
        .env("RN_TCP_ADDR", "not-an-address")
        .assert()
        .failure();

    let output = assert.get_output();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid listen address"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn shutdown_request_stops_daemon() {
    let mut runner = Runner::start();

    assert_eq!(runner.call(Request::Shutdown), Response::ShuttingDown);

    let status = runner.wait_exit(SPEC_WAIT_MAX_MS).expect("rnd should exit after Shutdown");
    assert!(status.success(), "exit status: {status}");
    assert!(!runner.state_dir().join("rnd.pid").exists());
}

#[test]
fn sigterm_stops_daemon() {
    let mut runner = Runner::start();

    let status = Command::new("kill").arg("-TERM").arg(runner.pid().to_string()).status().unwrap();
    assert!(status.success());

    let status = runner.wait_exit(SPEC_WAIT_MAX_MS).expect("rnd should exit on SIGTERM");
    assert!(status.success(), "exit status: {status}");
}

#[test]
fn daemon_log_is_written_under_state_dir() {
    let runner = Runner::start();
    assert_eq!(runner.call(Request::Ping), Response::Pong);

    let logs = runner.state_dir().join("logs");
    let found = wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_dir(&logs)
            .map(|entries| {
                entries.flatten().any(|e| e.file_name().to_string_lossy().starts_with("rnd.log"))
            })
            .unwrap_or(false)
    });
    assert!(found, "no rolling log file in {}", logs.display());
}
