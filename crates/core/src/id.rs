// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers issued by the controller.
//!
//! The runner never mints run or job ids itself; they arrive with the
//! submission and are only carried through logs, env and file names.

/// Define a string newtype ID backed by `SmolStr`.
///
/// Generates `new()`, `as_str()`, `short()`, `is_empty()`, `Display`,
/// `From<&str>`, `From<String>`, `PartialEq<str>`, `Borrow<str>` and `Deref`.
///
/// ```ignore
/// define_id! {
///     /// Identifier of a run.
///     pub struct RunId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(smol_str::SmolStr::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the id truncated to at most `n` bytes, for log prefixes.
            pub fn short(&self, n: usize) -> &str {
                let end = std::cmp::min(n, self.0.len());
                self.0.get(..end).unwrap_or(&self.0)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(smol_str::SmolStr::from(s))
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of the run a job belongs to.
    pub struct RunId;
}

define_id! {
    /// Identifier of the job this runner executes.
    pub struct JobId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
