// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-directory preparation with git and tar.
//!
//! Remote repositories are cloned, pinned to the requested commit, and the
//! uploaded diff is applied on top. Local repositories arrive as a tarball
//! of the whole tree. File archives are unpacked last.

use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rn_core::{FileArchive, RepoType};
use rn_engine::{PrepareError, PrepareRequest, RepoPreparer};
use tokio::process::Command;
use zeroize::Zeroizing;

use super::subprocess::{run_checked, TAR_TIMEOUT};

/// Populates working directories using the system `git` and `tar`.
#[derive(Debug, Clone)]
pub struct GitRepoPreparer {
    git_timeout: Duration,
}

impl GitRepoPreparer {
    pub fn new(git_timeout: Duration) -> Self {
        Self { git_timeout }
    }
}

#[async_trait]
impl RepoPreparer for GitRepoPreparer {
    async fn prepare(&self, request: PrepareRequest<'_>) -> Result<(), PrepareError> {
        match request.context.run.repo.repo_type {
            RepoType::Remote => self.prepare_remote(&request).await?,
            RepoType::Local => extract(request.code_path, request.repo_dir).await?,
        }
        for archive in request.file_archives {
            unpack_file_archive(request.repo_dir, archive).await?;
        }
        Ok(())
    }
}

impl GitRepoPreparer {
    async fn prepare_remote(&self, request: &PrepareRequest<'_>) -> Result<(), PrepareError> {
        let repo = &request.context.run.repo;
        let repo_dir = request.repo_dir;

        if repo_dir.join(".git").exists() {
            tracing::info!(dir = %repo_dir.display(), "repository already cloned");
        } else {
            create_dir(repo_dir).await?;
            self.clone_repo(request).await?;
        }

        if let Some(hash) = repo.hash.as_deref().filter(|h| !h.is_empty()) {
            let mut cmd = git(repo_dir);
            cmd.args(["checkout", hash]);
            run_checked(cmd, self.git_timeout, "git checkout").await?;
        }

        let diff_len = tokio::fs::metadata(request.code_path)
            .await
            .map_err(|source| PrepareError::Io {
                context: format!("failed to stat {}", request.code_path.display()),
                source,
            })?
            .len();
        if diff_len > 0 {
            let mut cmd = git(repo_dir);
            cmd.arg("apply").arg(request.code_path);
            run_checked(cmd, self.git_timeout, "git apply").await?;
        }
        Ok(())
    }

    async fn clone_repo(&self, request: &PrepareRequest<'_>) -> Result<(), PrepareError> {
        let repo = &request.context.run.repo;
        let credentials = request.credentials;

        let base_url = credentials
            .map(|c| c.clone_url.as_str())
            .filter(|url| !url.is_empty())
            .or(repo.repo_url.as_deref())
            .ok_or_else(|| PrepareError::Failed("remote repository has no url".to_string()))?;
        let token = credentials.and_then(|c| c.oauth_token.as_deref()).filter(|t| !t.is_empty());
        let url = clone_url(base_url, token);

        let parent = request.repo_dir.parent().map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let key_file = match credentials.and_then(|c| c.private_key.as_deref()) {
            Some(key) if !key.is_empty() => Some(KeyFile::write(&parent, key)?),
            _ => None,
        };

        let mut cmd = Command::new("git");
        cmd.arg("clone");
        if let Some(branch) = repo.branch.as_deref().filter(|b| !b.is_empty()) {
            cmd.args(["--branch", branch]);
        }
        cmd.arg(url.as_str()).arg(request.repo_dir).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(key_file) = &key_file {
            cmd.env("GIT_SSH_COMMAND", key_file.ssh_command());
        }

        tracing::info!(dir = %request.repo_dir.display(), branch = ?repo.branch, "cloning repository");
        let result = run_checked(cmd, self.git_timeout, "git clone").await;
        drop(key_file);
        result.map(|_| ()).map_err(|err| redact(err, token))
    }
}

/// Embed an OAuth token into an https clone url.
fn clone_url(url: &str, token: Option<&str>) -> Zeroizing<String> {
    match (token, url.strip_prefix("https://")) {
        (Some(token), Some(rest)) => Zeroizing::new(format!("https://{token}@{rest}")),
        _ => Zeroizing::new(url.to_string()),
    }
}

/// Keep the token out of error messages that echo the clone url.
fn redact(err: PrepareError, token: Option<&str>) -> PrepareError {
    match (err, token) {
        (PrepareError::Command { command, message }, Some(token)) => {
            PrepareError::Command { command, message: message.replace(token, "***") }
        }
        (err, _) => err,
    }
}

fn git(repo_dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo_dir).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

async fn create_dir(path: &Path) -> Result<(), PrepareError> {
    tokio::fs::create_dir_all(path).await.map_err(|source| PrepareError::Io {
        context: format!("failed to create {}", path.display()),
        source,
    })
}

async fn extract(archive: &Path, dest: &Path) -> Result<(), PrepareError> {
    create_dir(dest).await?;
    let mut cmd = Command::new("tar");
    cmd.arg("-xf").arg(archive).arg("-C").arg(dest);
    run_checked(cmd, TAR_TIMEOUT, "tar extract").await.map(|_| ())
}

async fn unpack_file_archive(repo_dir: &Path, archive: &FileArchive) -> Result<(), PrepareError> {
    let dest = repo_dir.join(archive.path.trim_start_matches('/'));
    extract(&archive.archive, &dest).await?;
    if let Err(e) = tokio::fs::remove_file(&archive.archive).await {
        tracing::warn!(archive = %archive.archive.display(), error = %e, "failed to remove file archive");
    }
    Ok(())
}

/// Private key written for the duration of a clone. Removed on drop.
struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    fn write(dir: &Path, key: &str) -> Result<Self, PrepareError> {
        let path = dir.join(format!(".rn-deploy-key-{}", std::process::id()));
        let io_err = |source| PrepareError::Io { context: "failed to write deploy key".to_string(), source };
        std::fs::create_dir_all(dir).map_err(io_err)?;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)
            .map_err(io_err)?;
        let key_file = Self { path };
        file.write_all(key.as_bytes()).map_err(io_err)?;
        if !key.ends_with('\n') {
            file.write_all(b"\n").map_err(io_err)?;
        }
        Ok(key_file)
    }

    fn ssh_command(&self) -> String {
        format!(
            "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=no",
            self.path.display()
        )
    }
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove deploy key");
            }
        }
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
