// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use indexmap::IndexMap;

use crate::interpolate::interpolate;

/// Ordered environment for a child process.
///
/// Keys keep the position of their first insertion; overwriting a key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: IndexMap<String, String>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Merge `src` into this environment, left to right.
    ///
    /// With `interpolate` set, each value is expanded against the entries
    /// merged so far, so a later key may refer to an earlier one (including
    /// itself, to extend a previous value).
    pub fn update<I, K, V>(&mut self, src: I, interpolate_values: bool)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        for (key, value) in src {
            let key = key.into();
            let value = if interpolate_values {
                interpolate(value.as_ref(), |name| {
                    let found = self.vars.get(name);
                    if found.is_none() {
                        tracing::debug!(key = %key, var = name, "undefined variable expands to empty string");
                    }
                    found
                })
            } else {
                value.as_ref().to_string()
            };
            self.vars.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
