//! Core types shared by the scheduler and its consumers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a priority class name
pub const MAX_PRIORITY_LEN: usize = 6;

/// Priority class of a unit of work
///
/// A priority is 1 to 6 uppercase ASCII letters. Later values in the natural
/// alphabetic order are finer-grained and are dequeued first, so `"C"` (a leaf
/// fetch) runs before `"B"` (a course crawl), which runs before `"A"` (a
/// top-level crawl). Because ordering is lexicographic, `"BA"` sorts between
/// `"B"` and `"C"`.
///
/// The value is validated on construction and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(String);

impl Priority {
    /// Validate and wrap a priority class name
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPriority`] unless `value` consists of 1 to 6
    /// uppercase ASCII letters.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= MAX_PRIORITY_LEN
            && value.bytes().all(|b| b.is_ascii_uppercase());
        if valid {
            Ok(Self(value))
        } else {
            Err(Error::InvalidPriority(value))
        }
    }

    /// The priority class name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self("A".to_string())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Priority::new(value).map_err(serde::de::Error::custom)
    }
}

/// Snapshot of the unit a worker is currently executing
///
/// Taken just before the attempt runs, so `retries_remaining` still includes
/// the attempt in progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitInfo {
    /// Priority class of the unit
    pub priority: Priority,
    /// Attempts left, counting the one about to run
    pub retries_remaining: u32,
    /// Human-readable description used in logs
    pub description: String,
}

/// A unit of work that exhausted its retry budget
///
/// Returned by `wait()`; one entry per exhausted unit.
#[derive(Clone, Debug, Serialize)]
pub struct Failure {
    /// Description of the unit that failed
    pub description: String,
    /// Error detail from the final attempt
    pub error: String,
    /// Serialized arguments of a deferred call, if the unit carried any
    pub args: Option<serde_json::Value>,
}

impl Failure {
    /// Deserialize the failed unit's arguments back into their original type
    ///
    /// Returns `None` when the unit carried no arguments or they do not match `A`.
    pub fn args_as<A>(&self) -> Option<A>
    where
        A: serde::de::DeserializeOwned,
    {
        self.args
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.error)
    }
}
