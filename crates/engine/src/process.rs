// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process execution for jobs.
//!
//! The child leads its own process group so termination reaches
//! everything it spawned. Output is forwarded in raw chunks, in the order
//! they are read, to a single sink.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{Gid, Pid, Uid};
use rn_core::ResolvedUser;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Largest output chunk forwarded at once.
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for job process: {0}")]
    Wait(#[source] std::io::Error),
}

/// What to execute and how.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub argv: Vec<String>,
    /// Complete environment; nothing is inherited.
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
    /// Identity to switch to before exec, if any.
    pub user: Option<ResolvedUser>,
    /// Time between SIGTERM and SIGKILL on cancellation.
    pub kill_grace: Duration,
}

/// Run `spec` to completion, handing each output chunk to `on_output`.
///
/// When `cancel` fires the process group is terminated. Either way the
/// child is reaped and all output delivered before this returns.
pub async fn run_process<F>(
    spec: ProcessSpec,
    mut on_output: F,
    cancel: CancellationToken,
) -> Result<ExitStatus, ExecError>
where
    F: FnMut(&[u8]) + Send + 'static,
{
    let (program, args) = spec.argv.split_first().ok_or(ExecError::EmptyCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(user) = &spec.user {
        switch_user(&mut cmd, user);
    }

    let mut child = cmd
        .spawn()
        .map_err(|source| ExecError::Spawn { program: program.clone(), source })?;
    let pgid = child.id().and_then(|id| i32::try_from(id).ok()).map(Pid::from_raw);
    tracing::debug!(program = %program, pid = ?pgid, "job process started");

    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward(stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward(stderr, tx.clone())));
    }
    drop(tx);
    let sink = tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            on_output(&chunk);
        }
    });

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    let status = match exited {
        Some(status) => status.map_err(ExecError::Wait),
        None => terminate(&mut child, pgid, spec.kill_grace).await,
    };
    // Stragglers would keep the pipes open.
    signal_group(pgid, Signal::SIGKILL);

    for reader in readers {
        if let Err(e) = reader.await {
            tracing::warn!(error = %e, "output reader task failed");
        }
    }
    if let Err(e) = sink.await {
        tracing::warn!(error = %e, "output sink task failed");
    }
    status
}

async fn terminate(
    child: &mut Child,
    pgid: Option<Pid>,
    grace: Duration,
) -> Result<ExitStatus, ExecError> {
    signal_group(pgid, Signal::SIGTERM);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status.map_err(ExecError::Wait),
        Err(_) => {
            tracing::warn!(pid = ?pgid, grace_ms = grace.as_millis() as u64, "job ignored SIGTERM, killing");
            signal_group(pgid, Signal::SIGKILL);
            child.wait().await.map_err(ExecError::Wait)
        }
    }
}

fn signal_group(pgid: Option<Pid>, signal: Signal) {
    let Some(pgid) = pgid else { return };
    match killpg(pgid, signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = pgid.as_raw(), signal = signal.as_str(), error = %e, "failed to signal job process group"),
    }
}

async fn forward<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::Sender<Vec<u8>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read job output");
                break;
            }
        }
    }
}

/// Whether the child must change identity to run as `user`.
pub fn needs_user_switch(user: &ResolvedUser) -> bool {
    let uid = nix::unistd::getuid();
    uid.is_root() || user.uid != uid.as_raw() || user.gid != nix::unistd::getgid().as_raw()
}

#[allow(unsafe_code)]
fn switch_user(cmd: &mut Command, user: &ResolvedUser) {
    let uid = Uid::from_raw(user.uid);
    let gid = Gid::from_raw(user.gid);
    let gids: Vec<Gid> = user.gids.iter().copied().map(Gid::from_raw).collect();
    // SAFETY: the closure runs between fork and exec and only issues the
    // setgroups/setgid/setuid syscalls on data captured before the fork.
    unsafe {
        cmd.pre_exec(move || {
            nix::unistd::setgroups(&gids)?;
            nix::unistd::setgid(gid)?;
            nix::unistd::setuid(uid)?;
            Ok(())
        });
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
