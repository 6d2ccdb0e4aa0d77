// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-directory preparation seam.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use rn_core::{FileArchive, RepoCredentials, RunContext};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },
    #[error("{command} timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
    #[error("{0}")]
    Failed(String),
}

/// Inputs for populating a job's working directory.
#[derive(Debug, Clone, Copy)]
pub struct PrepareRequest<'a> {
    /// Directory to populate; created by the preparer.
    pub repo_dir: &'a Path,
    pub context: &'a RunContext,
    /// Uploaded code artifact: a diff for remote repos, a tarball for local ones.
    pub code_path: &'a Path,
    pub file_archives: &'a [FileArchive],
    pub credentials: Option<&'a RepoCredentials>,
}

/// Populates the working directory before the job starts.
///
/// Called once per run. Implementations must not keep the credentials.
#[async_trait]
pub trait RepoPreparer: Send + Sync + 'static {
    async fn prepare(&self, request: PrepareRequest<'_>) -> Result<(), PrepareError>;
}
