// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

//! Startup failures of the `rnd` binary itself.
//!
//! Also makes `cargo test` build `rnd` for the workspace specs.

use assert_cmd::Command;

#[test]
fn invalid_listen_address_exits_with_error() {
    let state_dir = tempfile::TempDir::new().unwrap();

    let assert = Command::cargo_bin("rnd")
        .unwrap()
        .env("RN_STATE_DIR", state_dir.path())
        .env("RN_TCP_ADDR", "not-an-address")
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
    assert!(stderr.starts_with("rnd: Invalid listen address"), "stderr: {stderr}");
}
