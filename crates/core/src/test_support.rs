// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{JobSpec, JobState, JobStateEvent, LogEvent, RunId, RunSpec, SubmitBody};

// ── Proptest strategies ─────────────────────────────────────────────────

pub mod strategies {
    use crate::JobState;
    use proptest::prelude::*;

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Running),
            Just(JobState::Done),
            Just(JobState::Failed),
            Just(JobState::Terminated),
        ]
    }

    /// Non-decreasing timestamps with occasional duplicates, starting near 1000.
    pub fn arb_timestamps(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
        proptest::collection::vec(0i64..4, 0..max_len).prop_map(|deltas| {
            let mut ts = 1_000;
            deltas
                .into_iter()
                .map(|d| {
                    ts += d;
                    ts
                })
                .collect()
        })
    }
}

// ── Factories ───────────────────────────────────────────────────────────

pub fn log_event(timestamp: i64, text: &str) -> LogEvent {
    LogEvent { message: text.as_bytes().to_vec(), timestamp }
}

pub fn state_event(timestamp: i64, state: JobState) -> JobStateEvent {
    JobStateEvent { state, timestamp, termination_reason: None, termination_message: None }
}

/// Submission for `spec` with a local repo and no credentials.
pub fn submit_body(spec: JobSpec) -> SubmitBody {
    SubmitBody {
        run: RunSpec {
            run_id: RunId::new("run-1"),
            run_name: "test-run".to_string(),
            repo: Default::default(),
        },
        job_spec: spec,
        cluster_info: Default::default(),
        secrets: Default::default(),
        repo_credentials: None,
    }
}
