// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol specs
//!
//! Verify the handshake, authentication and phase checks over real TCP.

use crate::prelude::*;

fn error_message(response: Response) -> String {
    match response {
        Response::Error { message } => message,
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn hello_reports_daemon_version() {
    let runner = Runner::start();

    let response = runner.call(Request::Hello { version: "spec".to_string(), token: None });

    assert_eq!(
        response,
        Response::Hello { version: rn_daemon::env::PROTOCOL_VERSION.to_string() }
    );
}

#[test]
fn hello_then_request_on_one_connection() {
    let runner = Runner::start();
    assert_eq!(runner.call_with_token(None, Request::Ping), Response::Pong);
}

#[test]
fn auth_token_is_enforced() {
    let runner = Runner::start_with(&[("RN_AUTH_TOKEN", "s3cret")]);

    assert_eq!(error_message(runner.call_plain(Request::Ping)), "unauthorized");
    assert_eq!(error_message(runner.call_with_token(Some("nope"), Request::Ping)), "unauthorized");
    assert_eq!(runner.call_with_token(Some("s3cret"), Request::Ping), Response::Pong);
}

#[test]
fn requests_out_of_phase_are_rejected() {
    let runner = Runner::start();

    let message = error_message(runner.call(Request::Run));
    assert!(message.contains("waiting_submit"), "message: {message}");

    let message = error_message(runner.call(Request::SetCodePath { path: "/tmp/code".into() }));
    assert!(message.starts_with("cannot set the code path"), "message: {message}");

    let job = json!({ "job_id": "job-1", "commands": ["true"] });
    assert_eq!(runner.call(submit(job.clone(), json!({}))), Response::Ok);
    let message = error_message(runner.call(submit(job, json!({}))));
    assert!(message.contains("waiting_code"), "message: {message}");
}

#[test]
fn pull_before_submit_is_empty_but_open() {
    let runner = Runner::start();

    let history = runner.pull(0);

    assert!(history.job_states.is_empty());
    assert!(history.job_logs.is_empty());
    assert!(history.has_more);
}

#[test]
fn metrics_answer_with_snapshot_or_error() {
    let runner = Runner::start();

    match runner.call(Request::Metrics) {
        Response::Metrics(metrics) => {
            assert!(metrics.timestamp_micro > 0);
            assert!(metrics.memory_working_set_bytes <= metrics.memory_usage_bytes);
        }
        Response::Error { message } => assert!(!message.is_empty()),
        other => panic!("unexpected response: {other:?}"),
    }
}
