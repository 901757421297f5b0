//! # crawl-tasks
//!
//! Priority-ordered, retry-bounded task scheduler for hierarchical crawls.
//!
//! ## Design Philosophy
//!
//! crawl-tasks is designed to be:
//! - **Tree-shaped** - Units of work submit further units while they run
//! - **Depth-first** - Finer-grained priority classes drain before coarser ones
//! - **Failure-tolerant** - Every unit gets a bounded number of attempts, and
//!   exhausted units are collected instead of aborting the run
//! - **Blocking** - Plain OS threads and a `wait()` barrier; no async runtime
//!
//! ## Quick Start
//!
//! ```no_run
//! use crawl_tasks::{DlTask, Downloader, Priority, TaskOptions, TaskScheduler};
//!
//! fn main() -> crawl_tasks::Result<()> {
//!     let mut scheduler = TaskScheduler::new();
//!     scheduler.start(4)?;
//!
//!     let downloader = Downloader::new(
//!         &scheduler.handle(),
//!         std::sync::Arc::new(crawl_tasks::downloader::BuiltinBackend::default()),
//!         3,
//!     );
//!
//!     let crawl_course = scheduler.register(
//!         TaskOptions::<String>::new("crawl_course").priority(Priority::new("B")?),
//!         |ctx, slug| {
//!             tracing::info!(worker = ctx.worker_name(), %slug, "Crawling course");
//!             Ok(())
//!         },
//!     );
//!     crawl_course.call("machine-learning".to_string());
//!
//!     for failure in scheduler.wait() {
//!         eprintln!("{failure}");
//!     }
//!
//!     let failed = downloader.download(&[DlTask::new(
//!         "https://example.com/syllabus.pdf",
//!         "out/syllabus.pdf",
//!     )])?;
//!     println!("{} download(s) failed", failed.len());
//!
//!     scheduler.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// File downloads on top of the scheduler
pub mod downloader;
/// Error types
pub mod error;
/// Deferred calls of plain functions
pub mod func_task;
/// Worker pool, queue, and barrier
pub mod scheduler;
/// Units of work
pub mod task;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{BackendKind, Config, DownloadConfig, SchedulerConfig};
pub use downloader::{Backend, DlTask, Downloader};
pub use error::{Error, Result, TaskError};
pub use func_task::{FuncTask, TaskOptions};
pub use scheduler::{Registered, SchedulerHandle, Scratch, TaskScheduler, WorkerContext};
pub use task::{Task, Work};
pub use types::{Failure, Priority, UnitInfo};
