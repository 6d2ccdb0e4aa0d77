// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk copy of a job's raw output.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only file receiving every output chunk of one job:
///   `<log_dir>/<job_id>.log`
///
/// Created before the process starts. Write failures after that are
/// logged and dropped; the in-memory history stays authoritative.
#[derive(Debug)]
pub struct JobLog {
    path: PathBuf,
    file: File,
    failed: bool,
}

impl JobLog {
    pub fn create(log_dir: &Path, job_id: &str) -> std::io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = job_log_path(log_dir, job_id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file, failed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, chunk: &[u8]) {
        if self.failed {
            return;
        }
        if let Err(e) = self.file.write_all(chunk) {
            self.failed = true;
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write job log");
        }
    }
}

pub fn job_log_path(log_dir: &Path, job_id: &str) -> PathBuf {
    log_dir.join(format!("{job_id}.log"))
}

#[cfg(test)]
#[path = "job_log_tests.rs"]
mod tests;
