// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete OS identity a job process runs as.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of resolving a [`crate::UserSpec`].
///
/// The uid and gid need not exist in the system account database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUser {
    pub uid: u32,
    pub gid: u32,
    /// Supplementary groups, ascending and unique, always containing `gid`.
    pub gids: Vec<u32>,
    pub username: Option<String>,
    pub home_dir: PathBuf,
}

impl ResolvedUser {
    /// Build a user, normalizing `gids` so they are sorted, unique and include `gid`.
    pub fn new(
        uid: u32,
        gid: u32,
        gids: impl IntoIterator<Item = u32>,
        username: Option<String>,
        home_dir: PathBuf,
    ) -> Self {
        let mut gids: Vec<u32> = gids.into_iter().chain(std::iter::once(gid)).collect();
        gids.sort_unstable();
        gids.dedup();
        Self { uid, gid, gids, username, home_dir }
    }

    /// Name for `USER`/`LOGNAME`, falling back to the numeric uid.
    pub fn display_name(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.uid.to_string())
    }
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
