// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run credential setup with guaranteed cleanup.

use async_trait::async_trait;
use rn_core::JobSpec;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct CredentialError(pub String);

/// Runs its cleanup when dropped, on every exit path of the run.
#[must_use = "dropping the guard runs the cleanup immediately"]
pub struct CleanupGuard {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl CleanupGuard {
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self { cleanup: Some(Box::new(cleanup)) }
    }

    pub fn noop() -> Self {
        Self { cleanup: None }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl std::fmt::Debug for CleanupGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupGuard").field("armed", &self.cleanup.is_some()).finish()
    }
}

/// Installs whatever credentials the job needs on the node.
#[async_trait]
pub trait CredentialSetup: Send + Sync + 'static {
    async fn setup(&self, spec: &JobSpec) -> Result<CleanupGuard, CredentialError>;
}

/// No node-level credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialSetup for NoCredentials {
    async fn setup(&self, _spec: &JobSpec) -> Result<CleanupGuard, CredentialError> {
        Ok(CleanupGuard::noop())
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
