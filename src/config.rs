//! Configuration types for crawl-tasks

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Worker pool configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads started by `start_with_config` (default: 3)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Which program performs downloads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process HTTP client
    #[default]
    Builtin,
    /// The `curl` command-line tool
    Curl,
    /// The `aria2c` command-line tool
    Aria2,
}

/// Download behavior configuration (backend selection, retries, HTTP settings)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Attempts per file before it is reported as failed (default: 3)
    #[serde(default = "default_download_ttl")]
    pub ttl: u32,

    /// Download backend (default: builtin)
    #[serde(default)]
    pub backend: BackendKind,

    /// Path to curl executable (auto-detected if None)
    #[serde(default)]
    pub curl_path: Option<PathBuf>,

    /// Path to aria2c executable (auto-detected if None)
    #[serde(default)]
    pub aria2_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Connect timeout for the builtin HTTP client, in seconds (default: 30)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent by the builtin HTTP client
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            ttl: default_download_ttl(),
            backend: BackendKind::default(),
            curl_path: None,
            aria2_path: None,
            search_path: true,
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Top-level configuration
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Config {
    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    ///
    /// [`Error::Serialization`] for malformed JSON, [`Error::Config`] for
    /// values that fail [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON configuration file
    ///
    /// # Errors
    ///
    /// As [`from_json_str`](Self::from_json_str), plus [`Error::Io`] if the
    /// file cannot be read.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_json_str(&json)
    }

    /// Reject settings the scheduler cannot run with
    ///
    /// # Errors
    ///
    /// [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.workers == 0 {
            return Err(Error::Config {
                message: "at least one worker is required".to_string(),
                key: Some("scheduler.workers".to_string()),
            });
        }
        if self.download.ttl == 0 {
            return Err(Error::Config {
                message: "download ttl must allow at least one attempt".to_string(),
                key: Some("download.ttl".to_string()),
            });
        }
        if self.download.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user agent must not be empty".to_string(),
                key: Some("download.user_agent".to_string()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_workers() -> usize {
    3
}

fn default_download_ttl() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("crawl-tasks/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
