// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rn-env: `${NAME}` interpolation and the ordered process environment.

mod env;
mod interpolate;

pub use env::Env;
pub use interpolate::{interpolate, is_valid_name};
