//! Environment snapshot read by the providers

use ahash::AHashMap;
use std::ffi::OsString;

/// Placeholder for facts the environment does not provide.
pub const NOT_AVAILABLE: &str = "n/a";

/// Literals that count as "false" for flag variables, compared case-insensitively.
const FALSE_VALUES: [&str; 5] = ["", "no", "false", "off", "0"];

/// Environment variables captured when a provider is created.
///
/// Providers never read the process environment directly, so tests can run
/// them against any set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: AHashMap<String, String>,
}

impl Environment {
    /// Empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        vars.into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    let key = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                    tracing::debug!(key = %key, "Skipping non UTF-8 environment variable");
                    None
                }
            })
            .collect()
    }

    /// Sets a variable.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Value of `key` if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of `key`, or `default` when unset.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Value of `key`, or `n/a` when unset.
    #[must_use]
    pub fn get_or_na(&self, key: &str) -> String {
        self.get_or(key, NOT_AVAILABLE)
    }

    /// Value of `key`, or empty when unset.
    #[must_use]
    pub fn get_or_empty(&self, key: &str) -> String {
        self.get_or(key, "")
    }

    /// True when `key` is set, even to an empty value.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// True when `key` is set to something other than a false literal.
    #[must_use]
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| !FALSE_VALUES.contains(&v.trim().to_ascii_lowercase().as_str()))
    }

    /// True when any of `keys` is set.
    #[must_use]
    pub fn any_set(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.is_set(k))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
