//! In-process HTTP backend using a blocking reqwest client

use super::{Backend, DlTask};
use crate::config::DownloadConfig;
use crate::error::{Result, TaskError};
use crate::scheduler::WorkerContext;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Duration;

/// Scratch key of the per-worker HTTP client
pub(super) const CLIENT_KEY: &str = "downloader.http_client";

/// Downloads with a built-in HTTP client
///
/// Each worker lazily builds one client and keeps it in its scratch space, so
/// connections are reused across the files that worker fetches.
#[derive(Clone, Debug)]
pub struct BuiltinBackend {
    connect_timeout: Duration,
    user_agent: String,
}

impl BuiltinBackend {
    /// Create a backend with explicit client settings
    pub fn new(connect_timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            connect_timeout,
            user_agent: user_agent.into(),
        }
    }

    /// Create a backend from download configuration
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(config.connect_timeout, config.user_agent.clone())
    }

    fn build_client(&self) -> Result<reqwest::blocking::Client> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .build()?;
        Ok(client)
    }

    pub(super) fn client(&self, ctx: &mut WorkerContext) -> Result<reqwest::blocking::Client> {
        let worker = ctx.worker_name().to_string();
        let client = ctx
            .scratch()
            .get_or_try_insert_with(CLIENT_KEY, || {
                tracing::debug!(worker = %worker, "Creating HTTP client");
                self.build_client()
            })?;
        // Clones share the connection pool
        Ok(client.clone())
    }

    fn try_fetch(&self, ctx: &mut WorkerContext, task: &DlTask) -> Result<()> {
        let client = self.client(ctx)?;

        if let Some(parent) = task.filename.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut response = client.get(&task.url).send()?.error_for_status()?;
        let mut writer = BufWriter::new(File::create(&task.filename)?);
        let bytes = response.copy_to(&mut writer)?;
        writer.flush()?;

        tracing::debug!(url = %task.url, bytes, "Fetched file");
        Ok(())
    }
}

impl Default for BuiltinBackend {
    fn default() -> Self {
        Self::from_config(&DownloadConfig::default())
    }
}

impl Backend for BuiltinBackend {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn fetch(&self, ctx: &mut WorkerContext, task: &DlTask) -> std::result::Result<(), TaskError> {
        self.try_fetch(ctx, task).map_err(Into::into)
    }
}
