// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner daemon library
//!
//! The `rnd` binary is a thin wrapper over these modules; the protocol types
//! are also used by controllers and the workspace specs.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;

pub use lifecycle::{Config, Daemon, LifecycleError, StartupResult};
pub use protocol::{Request, Response};
