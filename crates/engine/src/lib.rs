// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rn-engine: runs one job and records everything it does.

pub mod credentials;
pub mod executor;
pub mod job_log;
pub mod metrics;
pub mod prepare;
pub mod process;
pub mod state;
pub mod user;
pub mod vars;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use credentials::{CleanupGuard, CredentialError, CredentialSetup, NoCredentials};
pub use executor::{ExecutorConfig, JobExecutor, RunError, DEFAULT_KILL_GRACE};
pub use metrics::{GpuMetrics, MetricsCollector, MetricsError, SystemMetrics};
pub use prepare::{PrepareError, PrepareRequest, RepoPreparer};
pub use process::ExecError;
pub use state::{ExecutorState, SharedState};
pub use user::{Account, AccountDb, Group, NixAccountDb, ResolveError, UserResolver};
