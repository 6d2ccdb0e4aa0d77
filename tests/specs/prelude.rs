// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the specs.

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Instant;

pub use std::time::Duration;

pub use rn_core::{JobState, JobStateEvent, PullResponse, SubmitBody, TerminationReason};
pub use rn_daemon::protocol::ProtocolError;
pub use rn_daemon::{Request, Response};
pub use serde_json::json;
use tempfile::TempDir;

/// Upper bound for anything the specs wait on.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

const IPC_TIMEOUT: Duration = Duration::from_secs(5);

/// `rnd` from the target directory this spec binary was built into.
pub fn rnd_path() -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let target_dir = exe.parent().and_then(Path::parent).unwrap();
    let path = target_dir.join(format!("rnd{}", std::env::consts::EXE_SUFFIX));
    assert!(path.is_file(), "rnd not built at {}", path.display());
    path
}

/// Poll `check` every 20ms until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// A running `rnd` with its own state directory and port.
pub struct Runner {
    child: Child,
    addr: SocketAddr,
    token: Option<String>,
    state_dir: TempDir,
    work: TempDir,
    rt: tokio::runtime::Runtime,
}

impl Runner {
    pub fn start() -> Self {
        Self::start_with(&[])
    }

    /// Start with extra environment, e.g. `RN_AUTH_TOKEN`.
    pub fn start_with(env: &[(&str, &str)]) -> Self {
        let state_dir = TempDir::new().unwrap();
        let child = spawn_rnd(state_dir.path(), env);
        Self::attach(child, state_dir, env)
    }

    fn attach(mut child: Child, state_dir: TempDir, env: &[(&str, &str)]) -> Self {
        let stdout = child.stdout.take().unwrap();
        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).unwrap();
        let addr = match line.trim().strip_prefix("READY ") {
            Some(addr) => addr.parse().unwrap(),
            None => {
                let _ = child.kill();
                panic!("rnd did not start, first line: {line:?}");
            }
        };
        let token = env.iter().find(|(k, _)| *k == "RN_AUTH_TOKEN").map(|(_, v)| v.to_string());
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        Self { child, addr, token, state_dir, work: TempDir::new().unwrap(), rt }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state_dir(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// One request on a fresh connection, authenticating if configured.
    pub fn try_call(&self, request: &Request) -> Result<Response, ProtocolError> {
        match &self.token {
            Some(token) => self.rt.block_on(rn_daemon::protocol::call_with_hello(
                self.addr,
                Some(token.as_str()),
                request,
                IPC_TIMEOUT,
            )),
            None => self.rt.block_on(rn_daemon::protocol::call(self.addr, request, IPC_TIMEOUT)),
        }
    }

    pub fn call(&self, request: Request) -> Response {
        self.try_call(&request).unwrap()
    }

    /// One request with no Hello, regardless of configured auth.
    pub fn call_plain(&self, request: Request) -> Response {
        self.rt.block_on(rn_daemon::protocol::call(self.addr, &request, IPC_TIMEOUT)).unwrap()
    }

    /// Like [`Runner::call`], with an explicit Hello token.
    pub fn call_with_token(&self, token: Option<&str>, request: Request) -> Response {
        self.rt
            .block_on(rn_daemon::protocol::call_with_hello(self.addr, token, &request, IPC_TIMEOUT))
            .unwrap()
    }

    pub fn pull(&self, cursor: i64) -> PullResponse {
        match self.call(Request::Pull { cursor }) {
            Response::History(history) => history,
            other => panic!("expected history, got {other:?}"),
        }
    }

    /// Write `files` into a tarball and return its path.
    pub fn code_tarball(&self, files: &[(&str, &str)]) -> PathBuf {
        let src = self.work.path().join("code");
        for (path, contents) in files {
            let file = src.join(path);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, contents).unwrap();
        }
        std::fs::create_dir_all(&src).unwrap();
        let archive = self.work.path().join("code.tar");
        let status = Command::new("tar")
            .arg("-cf")
            .arg(&archive)
            .arg("-C")
            .arg(&src)
            .arg(".")
            .status()
            .unwrap();
        assert!(status.success(), "tar failed");
        archive
    }

    /// Submit `job_spec` with a local repo made of `files`, then start it.
    pub fn start_job(&self, job_spec: serde_json::Value, files: &[(&str, &str)]) {
        let code = self.code_tarball(files);
        assert_eq!(self.call(submit(job_spec, json!({ "repo_type": "local" }))), Response::Ok);
        assert_eq!(self.call(Request::SetCodePath { path: code }), Response::Ok);
        assert_eq!(self.call(Request::Run), Response::Ok);
    }

    /// Poll with an advancing cursor until the runner reports no more history.
    pub fn collect_until_done(&self) -> Collected {
        let mut collected = Collected::default();
        let mut cursor = 0;
        let finished = wait_for(SPEC_WAIT_MAX_MS, || {
            let history = self.pull(cursor);
            collected.absorb(&history);
            cursor = history.last_updated;
            !history.has_more
        });
        assert!(finished, "job did not finish; states so far: {:?}", collected.states());
        collected
    }

    /// Wait until a pull shows `state` among the job states.
    pub fn wait_for_state(&self, state: JobState) {
        let reached = wait_for(SPEC_WAIT_MAX_MS, || {
            self.pull(0).job_states.iter().any(|e| e.state == state)
        });
        assert!(reached, "job never reached {state}");
    }

    /// Wait for the process to exit on its own.
    pub fn wait_exit(&mut self, max_ms: u64) -> Option<ExitStatus> {
        let mut status = None;
        wait_for(max_ms, || {
            status = self.child.try_wait().unwrap();
            status.is_some()
        });
        status
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Start `rnd` on an ephemeral port without waiting for READY.
pub fn spawn_rnd(state_dir: &Path, env: &[(&str, &str)]) -> Child {
    let mut cmd = Command::new(rnd_path());
    cmd.env("RN_STATE_DIR", state_dir)
        .env("RN_TCP_ADDR", "127.0.0.1:0")
        .env("RN_LOG", "debug")
        .env("RN_KILL_GRACE_MS", "1000")
        .env_remove("RN_AUTH_TOKEN")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.spawn().unwrap()
}

/// A `Submit` request for `job_spec` in run `run-1`.
pub fn submit(job_spec: serde_json::Value, repo: serde_json::Value) -> Request {
    let body: SubmitBody = serde_json::from_value(json!({
        "run": { "run_id": "run-1", "run_name": "spec-run", "repo": repo },
        "job_spec": job_spec,
    }))
    .unwrap();
    Request::Submit { body: Box::new(body) }
}

/// Everything pulled over the life of a job.
#[derive(Debug, Default)]
pub struct Collected {
    pub job_states: Vec<JobStateEvent>,
    pub output: Vec<u8>,
    pub runner_log: Vec<u8>,
    pub timestamps: Vec<i64>,
}

impl Collected {
    fn absorb(&mut self, history: &PullResponse) {
        self.job_states.extend(history.job_states.iter().cloned());
        for event in &history.job_logs {
            self.output.extend_from_slice(&event.message);
        }
        for event in &history.runner_logs {
            self.runner_log.extend_from_slice(&event.message);
        }
        self.timestamps.extend(history.timestamps());
    }

    pub fn states(&self) -> Vec<JobState> {
        self.job_states.iter().map(|e| e.state).collect()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn runner_log(&self) -> String {
        String::from_utf8_lossy(&self.runner_log).into_owned()
    }

    pub fn last(&self) -> &JobStateEvent {
        self.job_states.last().unwrap()
    }
}
