// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rn_core::{FakeClock, JobState};
use std::time::Duration;

fn shared() -> (FakeClock, SharedState<FakeClock>) {
    let clock = FakeClock::new();
    (clock.clone(), SharedState::new(clock))
}

#[test]
fn new_state_waits_for_submit_with_empty_history() {
    let (_, state) = shared();
    assert_eq!(state.runner_state(), RunnerState::WaitingForSubmit);

    let history = state.history(0);
    assert!(history.is_empty());
    assert_eq!(history.last_updated, 0);
    assert!(history.has_more);
}

#[test]
fn streams_share_one_ordering() {
    let (_, state) = shared();
    {
        let mut s = state.write();
        s.push_job_state(JobState::Running.into());
    }
    state.push_job_log(b"hello\n");
    state.push_runner_log(b"runner line\n");
    state.write().push_job_state(JobState::Done.into());

    let history = state.history(0);
    let running = history.job_states[0].timestamp;
    let log = history.job_logs[0].timestamp;
    let runner = history.runner_logs[0].timestamp;
    let done = history.job_states[1].timestamp;
    assert!(running < log && log < runner && runner < done);
    assert_eq!(history.last_updated, done);
}

#[test]
fn cursor_returns_only_newer_events_per_stream() {
    let (clock, state) = shared();
    state.push_job_log(b"a");
    let cursor = state.history(0).last_updated;
    clock.advance(Duration::from_secs(1));
    state.push_job_log(b"b");
    state.push_runner_log(b"c");

    let history = state.history(cursor);
    assert_eq!(history.job_logs.len(), 1);
    assert_eq!(history.job_logs[0].message, b"b");
    assert_eq!(history.runner_logs.len(), 1);
    assert!(history.job_states.is_empty());

    let again = state.history(history.last_updated);
    assert!(again.is_empty());
}

#[test]
fn has_more_clears_in_terminal_runner_state() {
    let (_, state) = shared();
    {
        let mut s = state.write();
        s.push_job_state(JobState::Done.into());
        s.runner_state = RunnerState::WaitingForLogsFinished;
    }
    let history = state.history(0);
    assert!(!history.has_more);
    assert_eq!(history.job_states.len(), 1);
}

#[test]
fn concurrent_readers_see_ordered_snapshots() {
    let (_, state) = shared();
    let writer = {
        let state = state.clone();
        std::thread::spawn(move || {
            for i in 0..500 {
                state.push_job_log(format!("{i}\n").as_bytes());
                if i % 50 == 0 {
                    state.push_runner_log(b"tick\n");
                }
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let state = state.clone();
            std::thread::spawn(move || {
                let mut cursor = 0;
                for _ in 0..200 {
                    let history = state.history(cursor);
                    for pair in history.job_logs.windows(2) {
                        assert!(pair[0].timestamp <= pair[1].timestamp);
                    }
                    assert!(history.timestamps().all(|t| t > cursor && t <= history.last_updated));
                    cursor = history.last_updated;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(state.read().job_logs().len(), 500);
}

/// Pull from 0 with `max_bytes` until `has_more` clears or nothing new arrives.
fn pull_pages(state: &ExecutorState<FakeClock>, max_bytes: usize) -> Vec<PullResponse> {
    let mut pages = Vec::new();
    let mut cursor = 0;
    loop {
        let page = state.history_limited(cursor, max_bytes);
        let done = !page.has_more || page.is_empty();
        cursor = page.last_updated;
        pages.push(page);
        if done {
            return pages;
        }
    }
}

#[test]
fn large_history_is_split_into_resumable_pages() {
    let (clock, state) = shared();
    {
        let mut s = state.write();
        s.push_job_state(JobState::Running.into());
        for i in 0..10 {
            clock.advance(Duration::from_secs(1));
            s.push_job_log(format!("chunk {i:02}\n").as_bytes());
        }
        s.push_job_state(JobState::Done.into());
        s.runner_state = RunnerState::WaitingForLogsFinished;
    }

    let s = state.read();
    let full = s.history(0);
    assert!(!full.has_more);
    let pages = pull_pages(&s, 200);

    assert!(pages.len() > 2, "pages: {}", pages.len());
    for page in &pages[..pages.len() - 1] {
        assert!(page.has_more);
        assert_eq!(Some(page.last_updated), page.timestamps().max());
    }
    assert!(!pages[pages.len() - 1].has_more);

    let states: Vec<_> = pages.iter().flat_map(|p| p.job_states.clone()).collect();
    let logs: Vec<_> = pages.iter().flat_map(|p| p.job_logs.clone()).collect();
    assert_eq!(states, full.job_states);
    assert_eq!(logs, full.job_logs);
}

#[test]
fn oversized_event_is_still_returned() {
    let (_, state) = shared();
    state.push_job_log(&[b'x'; 64]);

    let page = state.read().history_limited(0, 16);
    assert_eq!(page.job_logs.len(), 1);
    assert!(page.has_more);
}

#[test]
fn pages_never_split_a_shared_timestamp() {
    let (_, state) = shared();
    {
        // Frozen clock: the in-second counter saturates and later events tie.
        let mut s = state.write();
        for _ in 0..1010 {
            s.push_job_log(b"0123456789");
        }
    }

    let s = state.read();
    let pages = pull_pages(&s, 50);
    let returned: usize = pages.iter().map(|p| p.job_logs.len()).sum();
    assert_eq!(returned, 1010);

    let last = s.job_logs().after(0).last().map(|e| e.timestamp);
    let tied = s.job_logs().after(0).iter().filter(|e| Some(e.timestamp) == last).count();
    assert!(tied > 5, "tied: {tied}");
    let holding: Vec<_> = pages
        .iter()
        .filter(|p| p.job_logs.iter().any(|e| Some(e.timestamp) == last))
        .collect();
    assert_eq!(holding.len(), 1);
    assert_eq!(holding[0].job_logs.len(), tied);
}
