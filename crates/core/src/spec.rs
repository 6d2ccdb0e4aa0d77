// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What the controller submits: the job to run and the context it runs in.
//!
//! Everything here is immutable once accepted by the executor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::id::{JobId, RunId};

/// Entrypoint used when the job does not declare one.
pub const DEFAULT_ENTRYPOINT: &[&str] = &["/bin/sh", "-c"];

/// Problems with a submitted spec that make it impossible to run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("user spec must set uid or username")]
    UserWithoutIdentity,
    #[error("job has neither an entrypoint nor commands")]
    EmptyCommand,
}

/// Declared identity for the job process, in container `USER` terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupname: Option<String>,
}

impl UserSpec {
    pub fn uid(uid: u32) -> Self {
        Self { uid: Some(uid), ..Self::default() }
    }

    pub fn username(name: impl Into<String>) -> Self {
        Self { username: Some(name.into()), ..Self::default() }
    }

    pub fn with_gid(mut self, gid: u32) -> Self {
        self.gid = Some(gid);
        self
    }

    pub fn with_groupname(mut self, name: impl Into<String>) -> Self {
        self.groupname = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.uid.is_none() && self.username.is_none() {
            return Err(SpecError::UserWithoutIdentity);
        }
        Ok(())
    }
}

/// An archive to unpack into the working directory before the job starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArchive {
    /// Archive on the node's filesystem.
    pub archive: PathBuf,
    /// Destination, relative to the working directory.
    pub path: String,
}

/// The workload itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: JobId,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub entrypoint: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    /// Declared environment, in declaration order.
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSpec>,
    /// Relative to the prepared working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Seconds; 0 disables the deadline.
    #[serde(default)]
    pub max_duration: u64,
    #[serde(default)]
    pub file_archives: Vec<FileArchive>,
}

impl JobSpec {
    /// Argument vector: entrypoint followed by the commands joined with `&&`.
    pub fn argv(&self) -> Result<Vec<String>, SpecError> {
        let mut argv: Vec<String> = if self.entrypoint.is_empty() {
            if self.commands.is_empty() {
                return Err(SpecError::EmptyCommand);
            }
            DEFAULT_ENTRYPOINT.iter().map(|s| s.to_string()).collect()
        } else {
            self.entrypoint.clone()
        };
        if !self.commands.is_empty() {
            argv.push(self.commands.join(" && "));
        }
        Ok(argv)
    }

    /// Deadline for the run, if any.
    pub fn max_duration(&self) -> Option<Duration> {
        (self.max_duration > 0).then(|| Duration::from_secs(self.max_duration))
    }
}

crate::builder! {
    JobSpecBuilder for JobSpec {
        into {
            job_id: JobId = "job-1",
            job_name: String = "test-job",
        }
        set {
            entrypoint: Vec<String> = Vec::new(),
            commands: Vec<String> = vec!["true".to_string()],
            env: IndexMap<String, String> = IndexMap::new(),
            max_duration: u64 = 0,
            file_archives: Vec<FileArchive> = Vec::new(),
        }
        option {
            user: UserSpec,
            working_dir: String,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoType {
    /// Cloned from a git remote, then the code diff is applied.
    #[default]
    Remote,
    /// The code artifact is a tarball of the whole tree.
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSpec {
    #[serde(default)]
    pub repo_type: RepoType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub run_id: RunId,
    #[serde(default)]
    pub run_name: String,
    #[serde(default)]
    pub repo: RepoSpec,
}

/// Placement of this node within a multi-node job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_addr: Option<String>,
    #[serde(default)]
    pub gpus_per_job: u32,
    #[serde(default)]
    pub nodes_num: u32,
    #[serde(default)]
    pub node_rank: u32,
}

/// Repository access secrets. Zeroed when dropped.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RepoCredentials {
    pub clone_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<String>,
}

impl std::fmt::Debug for RepoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoCredentials")
            .field("clone_url", &self.clone_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("oauth_token", &self.oauth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Run-level context the job executes in. Read-only during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    pub run: RunSpec,
    pub cluster_info: ClusterInfo,
    pub secrets: HashMap<String, String>,
}

/// Payload of a job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBody {
    pub run: RunSpec,
    pub job_spec: JobSpec,
    #[serde(default)]
    pub cluster_info: ClusterInfo,
    #[serde(default)]
    pub secrets: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_credentials: Option<RepoCredentials>,
}

impl SubmitBody {
    /// Split into the parts the executor keeps separately.
    pub fn into_parts(self) -> (JobSpec, RunContext, Option<RepoCredentials>) {
        let context =
            RunContext { run: self.run, cluster_info: self.cluster_info, secrets: self.secrets };
        (self.job_spec, context, self.repo_credentials)
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
