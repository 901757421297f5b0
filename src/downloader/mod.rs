//! File downloads as units of work on the task scheduler.
//!
//! The downloader is split into focused submodules:
//! - [`builtin`] - In-process HTTP backend
//! - [`subprocess`] - Backends driving the `curl` and `aria2c` programs
//!
//! [`Downloader::download`] registers a `download` facade on the scheduler,
//! submits one call per file, joins on the scheduler, and hands back the files
//! that exhausted their retry budget.

pub mod builtin;
pub mod subprocess;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use builtin::BuiltinBackend;
pub use subprocess::{Aria2Backend, CurlBackend};

use crate::config::{BackendKind, DownloadConfig};
use crate::error::{Error, Result, TaskError};
use crate::func_task::TaskOptions;
use crate::scheduler::{Registered, SchedulerHandle, WorkerContext};
use crate::types::Priority;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// One file to fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlTask {
    /// Source URL
    pub url: String,
    /// Destination path; parent directories are created as needed
    pub filename: PathBuf,
}

impl DlTask {
    /// Create a download of `url` into `filename`
    pub fn new(url: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

/// A way of transferring one file
///
/// Implementations are shared by every worker, so per-worker resources
/// (connection pools and the like) belong in the worker's scratch space.
pub trait Backend: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Verify the backend can work at all, before anything is submitted
    ///
    /// # Errors
    ///
    /// [`Error::NotSupported`](crate::Error::NotSupported) when the backend
    /// is unusable on this machine.
    fn check(&self) -> Result<()>;

    /// Fetch one file; any error counts as a failed attempt
    fn fetch(&self, ctx: &mut WorkerContext, task: &DlTask) -> std::result::Result<(), TaskError>;
}

/// Fan a list of downloads out over a scheduler's workers
pub struct Downloader {
    backend: Arc<dyn Backend>,
    dl: Registered<DlTask>,
}

impl Downloader {
    /// Bind `backend` to the scheduler behind `handle`
    ///
    /// Each file gets `ttl` attempts at priority `"A"`.
    pub fn new(handle: &SchedulerHandle, backend: Arc<dyn Backend>, ttl: u32) -> Self {
        let options = TaskOptions::<DlTask>::new("download")
            .desc("download")
            .priority(Priority::default())
            .ttl(ttl);
        let fetcher = Arc::clone(&backend);
        let dl = handle.register(options, move |ctx: &mut WorkerContext, task: &DlTask| {
            fetcher.fetch(ctx, task)
        });

        Self { backend, dl }
    }

    /// Build the backend selected in `config`
    pub fn from_config(handle: &SchedulerHandle, config: &DownloadConfig) -> Self {
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Builtin => Arc::new(BuiltinBackend::from_config(config)),
            BackendKind::Curl => Arc::new(CurlBackend::from_config(config)),
            BackendKind::Aria2 => Arc::new(Aria2Backend::from_config(config)),
        };
        Self::new(handle, backend, config.ttl)
    }

    /// The backend in use
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Download every task and return the ones that failed
    ///
    /// Blocks until the scheduler is idle. The scheduler's failure list is
    /// drained, so failures of unrelated units submitted concurrently are
    /// consumed here too; only the downloads among them are returned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTarget`] if a file name is not valid UTF-8, since
    ///   such a download could not be reported back if it failed
    /// - whatever [`Backend::check`] reports
    ///
    /// Nothing is submitted in either case.
    pub fn download(&self, tasks: &[DlTask]) -> Result<Vec<DlTask>> {
        if let Some(task) = tasks.iter().find(|task| task.filename.to_str().is_none()) {
            return Err(Error::InvalidTarget(task.filename.clone()));
        }
        self.backend.check()?;
        tracing::info!(
            backend = self.backend.name(),
            files = tasks.len(),
            "Starting downloads"
        );

        for task in tasks {
            self.dl.call(task.clone());
        }

        let failed: Vec<DlTask> = self
            .dl
            .handle()
            .wait()
            .into_iter()
            .filter_map(|failure| failure.args_as::<DlTask>())
            .collect();

        if failed.is_empty() {
            tracing::info!(files = tasks.len(), "All downloads finished");
        } else {
            tracing::warn!(
                failed = failed.len(),
                files = tasks.len(),
                "Some downloads failed"
            );
        }
        Ok(failed)
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("backend", &self.backend.name())
            .field("ttl", &self.dl.options().ttl_value())
            .finish()
    }
}
