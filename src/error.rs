//! Error types for crawl-tasks
//!
//! This module provides the crate-level error type used by the scheduler
//! lifecycle, configuration loading, and the download backends, plus the
//! boxed error type returned from inside units of work.

use thiserror::Error;

/// Result type alias for crawl-tasks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned from the body of a unit of work
///
/// Unit bodies may fail with anything that implements `std::error::Error`.
/// The scheduler never propagates these; it classifies them as transient
/// (retried) or exhausted (reported by `wait()`).
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for crawl-tasks
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "scheduler.workers")
        key: Option<String>,
    },

    /// Priority value outside the `[A-Z]{1,6}` grammar
    #[error("invalid priority {0:?}: expected 1 to 6 uppercase ASCII letters")]
    InvalidPriority(String),

    /// Worker pool cannot be started with this many workers
    #[error("invalid worker count {0}: at least one worker is required")]
    InvalidWorkerCount(usize),

    /// `start()` called on a scheduler whose workers are still running
    #[error("scheduler already started with {workers} worker(s)")]
    AlreadyStarted {
        /// Number of workers currently running
        workers: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (curl, aria2c, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, backend unusable, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Download target that cannot be recorded for failure reporting
    #[error("download target {0:?} is not valid UTF-8")]
    InvalidTarget(std::path::PathBuf),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Render an error together with its chain of sources
///
/// Produces `outer: cause: root cause`, which is what ends up in logs and in
/// [`Failure::error`](crate::types::Failure::error).
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        // Some wrappers already embed their source in Display
        if !rendered.ends_with(&cause_msg) {
            rendered.push_str(": ");
            rendered.push_str(&cause_msg);
        }
        source = cause.source();
    }
    rendered
}
