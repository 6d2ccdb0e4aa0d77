// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job termination specs
//!
//! Verify stop requests, deadlines and daemon shutdown while a job runs.

use crate::prelude::*;

#[test]
fn stop_terminates_running_job() {
    let runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-1", "commands": ["echo started", "sleep 30"] }), &[]);
    runner.wait_for_state(JobState::Running);
    assert_eq!(runner.call(Request::Stop), Response::Ok);
    let collected = runner.collect_until_done();

    assert_eq!(collected.states(), vec![JobState::Running, JobState::Terminated]);
    assert_eq!(collected.last().termination_reason, Some(TerminationReason::TerminatedByUser));
}

#[test]
fn max_duration_terminates_job() {
    let runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-1", "max_duration": 1, "commands": ["sleep 30"] }), &[]);
    let collected = runner.collect_until_done();

    assert_eq!(collected.states(), vec![JobState::Running, JobState::Terminated]);
    let last = collected.last();
    assert_eq!(last.termination_reason, Some(TerminationReason::MaxDurationExceeded));
    assert!(last.termination_message.as_deref().unwrap_or_default().contains("max duration"));
}

#[test]
fn job_ignoring_sigterm_is_killed() {
    let runner = Runner::start();

    runner.start_job(
        json!({ "job_id": "job-1", "commands": ["trap '' TERM; echo armed; sleep 30 & wait"] }),
        &[],
    );
    runner.wait_for_state(JobState::Running);
    let armed = wait_for(SPEC_WAIT_MAX_MS, || {
        runner.pull(0).job_logs.iter().any(|e| e.text().contains("armed"))
    });
    assert!(armed);
    assert_eq!(runner.call(Request::Stop), Response::Ok);
    let collected = runner.collect_until_done();

    assert_eq!(collected.last().state, JobState::Terminated);
}

#[test]
fn shutdown_during_job_exits_daemon() {
    let mut runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-1", "commands": ["sleep 30"] }), &[]);
    runner.wait_for_state(JobState::Running);
    assert_eq!(runner.call(Request::Shutdown), Response::ShuttingDown);

    let status = runner.wait_exit(SPEC_WAIT_MAX_MS).expect("rnd should exit after Shutdown");
    assert!(status.success(), "exit status: {status}");
}
