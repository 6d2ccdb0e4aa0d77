// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolution of a declared [`UserSpec`] into the identity a job runs as.
//!
//! Follows container `USER` semantics: the uid need not exist, an explicit
//! group replaces the account's memberships, and an unknown uid with no
//! group falls back to the root group.

use std::path::{Path, PathBuf};

use rn_core::{ResolvedUser, SpecError, UserSpec};
use thiserror::Error;

/// Marker in home directory paths that are deliberately absent.
const NONEXISTENT_MARKER: &str = "nonexistent";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("malformed {kind} in account database: {value:?}")]
    MalformedId { kind: &'static str, value: String },
    #[error("account lookup failed: {0}")]
    Lookup(String),
}

/// A passwd entry. Ids are kept as the database reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: String,
    pub gid: String,
    pub home_dir: String,
}

/// A group entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub gid: String,
}

/// System account and group database.
pub trait AccountDb: Send + Sync {
    fn user_by_id(&self, uid: u32) -> Result<Option<Account>, ResolveError>;
    fn user_by_name(&self, name: &str) -> Result<Option<Account>, ResolveError>;
    fn group_by_name(&self, name: &str) -> Result<Option<Group>, ResolveError>;
    /// Gids of every group `account` belongs to.
    fn group_ids(&self, account: &Account) -> Result<Vec<String>, ResolveError>;
    /// Uid of the agent process.
    fn current_uid(&self) -> u32;
}

/// Turns a [`UserSpec`] into a [`ResolvedUser`].
pub struct UserResolver<A> {
    db: A,
}

impl<A: AccountDb> UserResolver<A> {
    pub fn new(db: A) -> Self {
        Self { db }
    }

    /// Resolve `spec`, or the agent's own identity when there is none.
    pub fn resolve(&self, spec: Option<&UserSpec>) -> Result<ResolvedUser, ResolveError> {
        let spec = match spec {
            Some(spec) => {
                spec.validate()?;
                spec.clone()
            }
            None => UserSpec::uid(self.db.current_uid()),
        };

        let (uid, account) = match (spec.uid, spec.username.as_deref()) {
            (Some(uid), _) => (uid, self.db.user_by_id(uid)?),
            (None, Some(name)) => {
                let account = self
                    .db
                    .user_by_name(name)?
                    .ok_or_else(|| ResolveError::UserNotFound(name.to_string()))?;
                (parse_id("uid", &account.uid)?, Some(account))
            }
            (None, None) => return Err(SpecError::UserWithoutIdentity.into()),
        };

        let (gid, gids) = if let Some(gid) = spec.gid {
            (gid, vec![gid])
        } else if let Some(name) = spec.groupname.as_deref() {
            let group = self
                .db
                .group_by_name(name)?
                .ok_or_else(|| ResolveError::GroupNotFound(name.to_string()))?;
            let gid = parse_id("gid", &group.gid)?;
            (gid, vec![gid])
        } else if let Some(account) = &account {
            let gid = parse_id("gid", &account.gid)?;
            let mut gids = vec![gid];
            for id in self.db.group_ids(account)? {
                gids.push(parse_id("gid", &id)?);
            }
            (gid, gids)
        } else {
            (0, vec![0])
        };

        let home_dir = account
            .as_ref()
            .map(|a| usable_home_dir(&a.home_dir))
            .unwrap_or_else(|| PathBuf::from("/"));
        let username = account.map(|a| a.name).or(spec.username);

        Ok(ResolvedUser::new(uid, gid, gids, username, home_dir))
    }
}

fn parse_id(kind: &'static str, value: &str) -> Result<u32, ResolveError> {
    value.parse::<u32>().map_err(|_| ResolveError::MalformedId { kind, value: value.to_string() })
}

/// `home` if it is an absolute path to an existing directory, else `/`.
pub fn usable_home_dir(home: &str) -> PathBuf {
    let root = PathBuf::from("/");
    if home.is_empty() || home.contains(NONEXISTENT_MARKER) {
        return root;
    }
    let path = Path::new(home);
    if !path.is_absolute() {
        tracing::warn!(home, "home directory is not absolute, using /");
        return root;
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => path.to_path_buf(),
        Ok(_) => {
            tracing::warn!(home, "home directory is not a directory, using /");
            root
        }
        Err(e) => {
            tracing::warn!(home, error = %e, "home directory is unusable, using /");
            root
        }
    }
}

/// [`AccountDb`] backed by the system's passwd and group databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixAccountDb;

impl NixAccountDb {
    fn account(user: nix::unistd::User) -> Account {
        Account {
            name: user.name,
            uid: user.uid.as_raw().to_string(),
            gid: user.gid.as_raw().to_string(),
            home_dir: user.dir.to_string_lossy().into_owned(),
        }
    }
}

impl AccountDb for NixAccountDb {
    fn user_by_id(&self, uid: u32) -> Result<Option<Account>, ResolveError> {
        nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
            .map(|user| user.map(Self::account))
            .map_err(|e| ResolveError::Lookup(e.to_string()))
    }

    fn user_by_name(&self, name: &str) -> Result<Option<Account>, ResolveError> {
        nix::unistd::User::from_name(name)
            .map(|user| user.map(Self::account))
            .map_err(|e| ResolveError::Lookup(e.to_string()))
    }

    fn group_by_name(&self, name: &str) -> Result<Option<Group>, ResolveError> {
        nix::unistd::Group::from_name(name)
            .map(|group| {
                group.map(|g| Group { name: g.name, gid: g.gid.as_raw().to_string() })
            })
            .map_err(|e| ResolveError::Lookup(e.to_string()))
    }

    fn group_ids(&self, account: &Account) -> Result<Vec<String>, ResolveError> {
        let name = std::ffi::CString::new(account.name.as_str())
            .map_err(|e| ResolveError::Lookup(e.to_string()))?;
        let gid = nix::unistd::Gid::from_raw(parse_id("gid", &account.gid)?);
        nix::unistd::getgrouplist(&name, gid)
            .map(|gids| gids.into_iter().map(|g| g.as_raw().to_string()).collect())
            .map_err(|e| ResolveError::Lookup(e.to_string()))
    }

    fn current_uid(&self) -> u32 {
        nix::unistd::getuid().as_raw()
    }
}

impl<A: AccountDb + ?Sized> AccountDb for std::sync::Arc<A> {
    fn user_by_id(&self, uid: u32) -> Result<Option<Account>, ResolveError> {
        (**self).user_by_id(uid)
    }

    fn user_by_name(&self, name: &str) -> Result<Option<Account>, ResolveError> {
        (**self).user_by_name(name)
    }

    fn group_by_name(&self, name: &str) -> Result<Option<Group>, ResolveError> {
        (**self).group_by_name(name)
    }

    fn group_ids(&self, account: &Account) -> Result<Vec<String>, ResolveError> {
        (**self).group_ids(account)
    }

    fn current_uid(&self) -> u32 {
        (**self).current_uid()
    }
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
