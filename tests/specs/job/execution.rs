// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution specs
//!
//! Submit real jobs to `rnd` and follow them through the pull cursor.

use crate::prelude::*;

#[test]
fn job_runs_to_done_and_streams_output() {
    let runner = Runner::start();

    runner.start_job(
        json!({
            "job_id": "job-1",
            "job_name": "hello",
            "commands": ["cat greeting.txt", "echo done"],
        }),
        &[("greeting.txt", "hello from the repo\n")],
    );
    let collected = runner.collect_until_done();

    assert_eq!(collected.states(), vec![JobState::Running, JobState::Done]);
    assert_eq!(collected.last().termination_reason, Some(TerminationReason::DoneByRunner));
    assert_eq!(collected.output(), "hello from the repo\ndone\n");
}

#[test]
fn job_output_is_also_written_to_the_job_log_file() {
    let runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-log", "commands": ["echo to the file"] }), &[]);
    runner.collect_until_done();

    let log = runner.state_dir().join("logs").join("jobs").join("job-log.log");
    assert_eq!(std::fs::read_to_string(log).unwrap(), "to the file\n");
}

#[test]
fn declared_env_is_interpolated() {
    let runner = Runner::start();

    runner.start_job(
        json!({
            "job_id": "job-1",
            "job_name": "hello",
            "env": {
                "GREETING": "hi ${RN_JOB_NAME}",
                "LITERAL": "$${RN_JOB_NAME}",
                "MISSING": "[${NOT_DEFINED}]",
            },
            "commands": ["echo \"$GREETING\"", "echo \"$LITERAL\"", "echo \"$MISSING\""],
        }),
        &[],
    );
    let collected = runner.collect_until_done();

    assert_eq!(collected.states(), vec![JobState::Running, JobState::Done]);
    assert_eq!(collected.output(), "hi hello\n${RN_JOB_NAME}\n[]\n");
}

#[test]
fn job_runs_in_declared_working_dir() {
    let runner = Runner::start();

    runner.start_job(
        json!({ "job_id": "job-1", "working_dir": "app/src", "commands": ["pwd", "cat main.txt"] }),
        &[("app/src/main.txt", "main\n")],
    );
    let collected = runner.collect_until_done();

    let output = collected.output();
    let mut lines = output.lines();
    assert!(lines.next().unwrap().ends_with("/workdir/app/src"), "output: {output}");
    assert_eq!(lines.next(), Some("main"));
}

#[test]
fn failing_command_marks_job_failed() {
    let runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-1", "commands": ["echo oops >&2", "exit 3"] }), &[]);
    let collected = runner.collect_until_done();

    assert_eq!(collected.states(), vec![JobState::Running, JobState::Failed]);
    let last = collected.last();
    assert_eq!(last.termination_reason, Some(TerminationReason::ExecutorError));
    assert!(last.termination_message.as_deref().unwrap_or_default().contains("exit"));
    assert_eq!(collected.output(), "oops\n");
}

#[test]
fn job_without_command_fails_before_running() {
    let runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-1", "commands": [] }), &[]);
    let collected = runner.collect_until_done();

    assert_eq!(collected.states(), vec![JobState::Failed]);
    let message = collected.last().termination_message.clone().unwrap_or_default();
    assert!(message.contains("neither an entrypoint nor commands"), "message: {message}");
}

#[test]
fn incremental_pulls_match_a_full_pull() {
    let runner = Runner::start();

    runner.start_job(
        json!({ "job_id": "job-1", "commands": ["for i in 1 2 3 4 5; do echo line $i; sleep 0.05; done"] }),
        &[],
    );
    let collected = runner.collect_until_done();
    let full = runner.pull(0);

    assert_eq!(full.job_states, collected.job_states);
    let full_output: Vec<u8> = full.job_logs.iter().flat_map(|e| e.message.clone()).collect();
    assert_eq!(full_output, collected.output);
    assert_eq!(collected.output(), "line 1\nline 2\nline 3\nline 4\nline 5\n");
    for pair in full.job_states.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
    assert!(!full.has_more);
}

#[test]
fn runner_diagnostics_are_pulled_with_the_job() {
    let runner = Runner::start();

    runner.start_job(json!({ "job_id": "job-diag", "commands": ["true"] }), &[]);
    let collected = runner.collect_until_done();

    let log = collected.runner_log();
    assert!(log.contains("job submitted"), "runner log: {log}");
    assert!(log.contains("job-diag"), "runner log: {log}");
}
