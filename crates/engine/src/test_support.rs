// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborators for executor tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::prepare::{PrepareError, PrepareRequest, RepoPreparer};
use crate::user::{Account, AccountDb, Group, ResolveError};

/// In-memory account database.
#[derive(Debug, Clone, Default)]
pub struct FakeAccountDb {
    users: Vec<Account>,
    groups: Vec<Group>,
    memberships: HashMap<String, Vec<String>>,
    current_uid: u32,
}

impl FakeAccountDb {
    /// Empty database; the agent runs as uid 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: &str, uid: &str, gid: &str, home: &str) -> Self {
        self.users.push(Account {
            name: name.to_string(),
            uid: uid.to_string(),
            gid: gid.to_string(),
            home_dir: home.to_string(),
        });
        self
    }

    pub fn with_group(mut self, name: &str, gid: &str) -> Self {
        self.groups.push(Group { name: name.to_string(), gid: gid.to_string() });
        self
    }

    pub fn with_groups(mut self, user: &str, gids: &[&str]) -> Self {
        self.memberships.insert(user.to_string(), gids.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn with_current_uid(mut self, uid: u32) -> Self {
        self.current_uid = uid;
        self
    }

    /// Database whose current user is this process, so jobs run without
    /// switching identity.
    pub fn current_process() -> Self {
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        Self::new().with_user("runner", &uid.to_string(), &gid.to_string(), "/").with_current_uid(uid)
    }
}

impl AccountDb for FakeAccountDb {
    fn user_by_id(&self, uid: u32) -> Result<Option<Account>, ResolveError> {
        let uid = uid.to_string();
        Ok(self.users.iter().find(|a| a.uid == uid).cloned())
    }

    fn user_by_name(&self, name: &str) -> Result<Option<Account>, ResolveError> {
        Ok(self.users.iter().find(|a| a.name == name).cloned())
    }

    fn group_by_name(&self, name: &str) -> Result<Option<Group>, ResolveError> {
        Ok(self.groups.iter().find(|g| g.name == name).cloned())
    }

    fn group_ids(&self, account: &Account) -> Result<Vec<String>, ResolveError> {
        Ok(self.memberships.get(&account.name).cloned().unwrap_or_default())
    }

    fn current_uid(&self) -> u32 {
        self.current_uid
    }
}

/// What a [`FakePreparer`] was asked to do.
#[derive(Debug, Clone)]
pub struct PrepareCall {
    pub repo_dir: PathBuf,
    pub code_path: PathBuf,
    pub had_credentials: bool,
}

struct FakePreparerState {
    calls: Vec<PrepareCall>,
    fail_with: Option<String>,
}

/// Preparer that only creates the directory and records the call.
#[derive(Clone)]
pub struct FakePreparer {
    inner: Arc<Mutex<FakePreparerState>>,
}

impl Default for FakePreparer {
    fn default() -> Self {
        Self { inner: Arc::new(Mutex::new(FakePreparerState { calls: Vec::new(), fail_with: None })) }
    }
}

impl FakePreparer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        self.inner.lock().fail_with = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<PrepareCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl RepoPreparer for FakePreparer {
    async fn prepare(&self, request: PrepareRequest<'_>) -> Result<(), PrepareError> {
        let fail_with = {
            let mut state = self.inner.lock();
            state.calls.push(PrepareCall {
                repo_dir: request.repo_dir.to_path_buf(),
                code_path: request.code_path.to_path_buf(),
                had_credentials: request.credentials.is_some(),
            });
            state.fail_with.clone()
        };
        if let Some(message) = fail_with {
            return Err(PrepareError::Failed(message));
        }
        tokio::fs::create_dir_all(request.repo_dir)
            .await
            .map_err(|source| PrepareError::Io { context: "create repo dir".to_string(), source })
    }
}
