// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapters for external I/O

pub mod cgroup;
pub mod git;
pub mod subprocess;

pub use cgroup::{is_cgroup_v2, CgroupMetrics, DEFAULT_CGROUP_ROOT};
pub use git::GitRepoPreparer;
