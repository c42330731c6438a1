//! Snapshot of the process environment taken once at startup.

use std::{collections::HashMap, env};

/// Name of the variable whose value activates the monitoring agent.
pub const ACCOUNT_KEY_VAR: &str = "NODETIME_ACCOUNT_KEY";

/// An immutable name to value mapping, read once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Captures the current process environment. Entries that are not valid UTF-8 are
    /// skipped.
    pub fn from_process() -> Self {
        env::vars_os()
            .filter_map(|(name, value)| {
                Some((name.into_string().ok()?, value.into_string().ok()?))
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// The monitoring account key, if set to a non-empty value.
    pub fn account_key(&self) -> Option<&str> {
        self.get(ACCOUNT_KEY_VAR).filter(|key| !key.is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
