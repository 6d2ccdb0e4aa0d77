// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job executor: the runner state machine and run orchestration.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use rn_core::timestamp::warn_saturated;
use rn_core::{
    Clock, JobSpec, JobState, JobStateChange, PullResponse, RepoCredentials, RunContext,
    RunnerState, SpecError, SubmitBody, SystemClock, TerminationReason,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::credentials::{CredentialError, CredentialSetup, NoCredentials};
use crate::job_log::{job_log_path, JobLog};
use crate::prepare::{PrepareError, PrepareRequest, RepoPreparer};
use crate::process::{needs_user_switch, run_process, ExecError, ProcessSpec};
use crate::state::{ExecutorState, SharedState};
use crate::user::{AccountDb, NixAccountDb, ResolveError, UserResolver};
use crate::vars::job_env;

/// SIGTERM to SIGKILL delay used unless configured otherwise.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(10);

/// Errors from executor operations.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot {action} while runner is {state}")]
    InvalidState { action: &'static str, state: RunnerState },
    #[error("invalid job: {0}")]
    Spec(#[from] SpecError),
    #[error("failed to prepare working directory: {0}")]
    Prepare(#[from] PrepareError),
    #[error("failed to set up credentials: {0}")]
    Credentials(#[from] CredentialError),
    #[error("failed to resolve user: {0}")]
    User(#[from] ResolveError),
    #[error("failed to create working directory {}: {source}", path.display())]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create job log {}: {source}", path.display())]
    JobLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to execute job: {0}")]
    Exec(#[from] ExecError),
    #[error("job exited with {0}")]
    NonZeroExit(ExitStatus),
    #[error("job terminated by user")]
    Terminated,
    #[error("job exceeded max duration of {}s", .0.as_secs())]
    MaxDurationExceeded(Duration),
}

impl RunError {
    /// Job state change recording this error as the outcome of a run.
    fn job_state_change(&self) -> JobStateChange {
        match self {
            RunError::Terminated => JobStateChange::new(JobState::Terminated)
                .with_reason(TerminationReason::TerminatedByUser),
            RunError::MaxDurationExceeded(_) => JobStateChange::new(JobState::Terminated)
                .with_reason(TerminationReason::MaxDurationExceeded)
                .with_message(self.to_string()),
            _ => JobStateChange::new(JobState::Failed)
                .with_reason(TerminationReason::ExecutorError)
                .with_message(self.to_string()),
        }
    }
}

/// Where jobs run and how they are stopped.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Repository checkout; the job's `working_dir` is relative to it.
    pub working_root: PathBuf,
    /// Directory for per-job output logs.
    pub log_dir: PathBuf,
    pub kill_grace: Duration,
}

impl ExecutorConfig {
    pub fn new(working_root: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_root: working_root.into(),
            log_dir: log_dir.into(),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    rn_core::setters! {
        into { working_root: PathBuf, log_dir: PathBuf }
        set { kill_grace: Duration }
    }
}

/// Drives one job from submission to a terminal state.
///
/// Share it behind an `Arc`: `run` executes on its own task while other
/// tasks poll [`JobExecutor::history`].
pub struct JobExecutor<C: Clock = SystemClock> {
    state: SharedState<C>,
    config: ExecutorConfig,
    preparer: Arc<dyn RepoPreparer>,
    credentials: Arc<dyn CredentialSetup>,
    users: UserResolver<Arc<dyn AccountDb>>,
    stop: CancellationToken,
}

impl<C: Clock> JobExecutor<C> {
    /// Executor recording into `state`, using the system account database
    /// and no node-level credentials.
    pub fn new(state: SharedState<C>, config: ExecutorConfig, preparer: Arc<dyn RepoPreparer>) -> Self {
        Self {
            state,
            config,
            preparer,
            credentials: Arc::new(NoCredentials),
            users: UserResolver::new(Arc::new(NixAccountDb)),
            stop: CancellationToken::new(),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSetup>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountDb>) -> Self {
        self.users = UserResolver::new(accounts);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn state(&self) -> &SharedState<C> {
        &self.state
    }

    /// Shared lock over all executor state, for multi-field snapshots.
    pub fn read(&self) -> RwLockReadGuard<'_, ExecutorState<C>> {
        self.state.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ExecutorState<C>> {
        self.state.write()
    }

    pub fn runner_state(&self) -> RunnerState {
        self.state.runner_state()
    }

    pub fn history(&self, cursor: i64) -> PullResponse {
        self.state.history(cursor)
    }

    /// Accept the job. Only valid before anything else has happened.
    pub fn set_job(&self, body: SubmitBody) -> Result<(), RunError> {
        let (spec, context, credentials) = body.into_parts();
        let job_id = spec.job_id.clone();
        {
            let mut s = self.state.write();
            check_state(&s, RunnerState::WaitingForSubmit, "submit a job")?;
            s.submission.spec = Some(Arc::new(spec));
            s.submission.context = Some(Arc::new(context));
            s.submission.credentials = credentials;
            s.runner_state = RunnerState::WaitingForCode;
        }
        tracing::info!(%job_id, "job submitted");
        Ok(())
    }

    /// Record where the uploaded code artifact is.
    pub fn set_code_path(&self, path: impl Into<PathBuf>) -> Result<(), RunError> {
        let path = path.into();
        {
            let mut s = self.state.write();
            check_state(&s, RunnerState::WaitingForCode, "set the code path")?;
            s.submission.code_path = Some(path.clone());
            s.runner_state = RunnerState::WaitingForRun;
        }
        tracing::info!(path = %path.display(), "code path set");
        Ok(())
    }

    /// Append a job state transition to the history.
    pub fn set_job_state(&self, change: JobStateChange) {
        let (tick, job_id) = {
            let mut s = self.state.write();
            let job_id = s.submission.spec.as_ref().map(|spec| spec.job_id.clone());
            (s.push_job_state(change.clone()), job_id)
        };
        if tick.saturated {
            warn_saturated(tick.value);
        }
        log_transition(job_id.as_ref().map(|id| id.as_str()).unwrap_or_default(), &change);
    }

    /// Cancel the running job. It is recorded as terminated by the user.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            tracing::info!(runner_state = %self.runner_state(), "stop requested");
            self.stop.cancel();
        }
    }

    /// Token that fires when [`JobExecutor::stop`] is called.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Run the submitted job to completion. Valid once per executor.
    ///
    /// The outcome is recorded as the final job state and the runner moves
    /// to its terminal phase in the same critical section.
    pub async fn run(&self) -> Result<(), RunError> {
        let (spec, context, code_path, credentials) = self.start()?;
        tracing::info!(job_id = %spec.job_id, "starting job");

        let result = self.execute(&spec, &context, &code_path, credentials).await;
        let change = match &result {
            Ok(()) => JobStateChange::new(JobState::Done).with_reason(TerminationReason::DoneByRunner),
            Err(e) => e.job_state_change(),
        };

        let tick = {
            let mut s = self.state.write();
            let tick = s.push_job_state(change.clone());
            s.runner_state = RunnerState::WaitingForLogsFinished;
            tick
        };
        if tick.saturated {
            warn_saturated(tick.value);
        }
        log_transition(spec.job_id.as_str(), &change);
        if let Err(e) = &result {
            tracing::warn!(job_id = %spec.job_id, error = %e, "job did not complete");
        }
        result
    }

    #[allow(clippy::type_complexity)]
    fn start(
        &self,
    ) -> Result<(Arc<JobSpec>, Arc<RunContext>, PathBuf, Option<RepoCredentials>), RunError> {
        let mut s = self.state.write();
        check_state(&s, RunnerState::WaitingForRun, "run")?;
        let submission = &mut s.submission;
        let (Some(spec), Some(context), Some(code_path)) =
            (submission.spec.clone(), submission.context.clone(), submission.code_path.clone())
        else {
            return Err(RunError::InvalidState { action: "run", state: s.runner_state });
        };
        let credentials = submission.credentials.take();
        s.runner_state = RunnerState::Running;
        Ok((spec, context, code_path, credentials))
    }

    async fn execute(
        &self,
        spec: &JobSpec,
        context: &RunContext,
        code_path: &Path,
        credentials: Option<RepoCredentials>,
    ) -> Result<(), RunError> {
        let repo_dir = self.config.working_root.as_path();
        {
            // Zeroed on drop, whichever way the preparation ends.
            let credentials = credentials;
            self.preparer
                .prepare(PrepareRequest {
                    repo_dir,
                    context,
                    code_path,
                    file_archives: &spec.file_archives,
                    credentials: credentials.as_ref(),
                })
                .await?;
        }

        let _cleanup = self.credentials.setup(spec).await?;
        let user = self.users.resolve(spec.user.as_ref())?;
        let argv = spec.argv()?;

        let cwd = match &spec.working_dir {
            Some(dir) => repo_dir.join(dir),
            None => repo_dir.to_path_buf(),
        };
        tokio::fs::create_dir_all(&cwd)
            .await
            .map_err(|source| RunError::WorkingDir { path: cwd.clone(), source })?;
        let mut job_log = JobLog::create(&self.config.log_dir, spec.job_id.as_str()).map_err(|source| {
            RunError::JobLog { path: job_log_path(&self.config.log_dir, spec.job_id.as_str()), source }
        })?;

        let env = job_env(spec, context, &user, std::env::var("PATH").ok());
        let process = ProcessSpec {
            argv,
            env: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            cwd,
            user: needs_user_switch(&user).then(|| user.clone()),
            kill_grace: self.config.kill_grace,
        };
        tracing::info!(
            job_id = %spec.job_id,
            uid = user.uid,
            gid = user.gid,
            gids = ?user.gids,
            "resolved job user"
        );

        self.set_job_state(JobState::Running.into());

        let cancel = self.stop.child_token();
        let deadline = spec.max_duration().map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                cancel.cancel();
            })
        });

        let state = self.state.clone();
        let result = run_process(
            process,
            move |chunk| {
                state.push_job_log(chunk);
                job_log.append(chunk);
            },
            cancel.clone(),
        )
        .await;
        if let Some(deadline) = deadline {
            deadline.abort();
        }

        if self.stop.is_cancelled() {
            return Err(RunError::Terminated);
        }
        if cancel.is_cancelled() {
            return Err(RunError::MaxDurationExceeded(spec.max_duration().unwrap_or_default()));
        }
        let status = result?;
        if !status.success() {
            return Err(RunError::NonZeroExit(status));
        }
        Ok(())
    }
}

fn check_state<C: Clock>(
    s: &ExecutorState<C>,
    expected: RunnerState,
    action: &'static str,
) -> Result<(), RunError> {
    if s.runner_state != expected {
        return Err(RunError::InvalidState { action, state: s.runner_state });
    }
    Ok(())
}

fn log_transition(job_id: &str, change: &JobStateChange) {
    tracing::info!(
        job_id,
        state = %change.state,
        reason = ?change.termination_reason,
        message = change.termination_message.as_deref(),
        "job state changed"
    );
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
