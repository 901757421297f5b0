//! Priority-ordered, retry-bounded task scheduler with a fixed worker pool.
//!
//! The scheduler is split into focused submodules:
//! - `queue` - Queue entries and dequeue ordering
//! - `worker` - Worker loop, retry policy, and per-worker context
//! - [`register`] - Submission facade turning functions into deferred calls
//!
//! Units of work may submit further units while they execute, so a single
//! root submission can grow into a task tree of unknown shape. The only notion
//! of "done" is the global outstanding-work counter reaching zero, which is
//! what [`TaskScheduler::wait`] blocks on.
//!
//! # Example
//!
//! ```
//! use crawl_tasks::{Priority, TaskOptions, TaskScheduler};
//!
//! # fn main() -> crawl_tasks::Result<()> {
//! let mut scheduler = TaskScheduler::new();
//! scheduler.start(2)?;
//!
//! let fetch = scheduler.register(
//!     TaskOptions::<u32>::new("fetch").priority(Priority::new("C")?).ttl(3),
//!     |_ctx, page| {
//!         if *page == 0 {
//!             return Err("page zero does not exist".into());
//!         }
//!         Ok(())
//!     },
//! );
//!
//! for page in 0..4 {
//!     fetch.call(page);
//! }
//!
//! let failures = scheduler.wait();
//! assert_eq!(failures.len(), 1);
//! scheduler.shutdown();
//! # Ok(())
//! # }
//! ```

mod queue;
pub mod register;
mod worker;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use register::Registered;
pub use worker::{Scratch, WorkerContext};

use crate::config::SchedulerConfig;
use crate::error::{Error, Result, TaskError};
use crate::func_task::TaskOptions;
use crate::task::Task;
use crate::types::Failure;
use queue::{QueueEntry, TaskQueue};
use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// Lock a mutex, recovering the guard if another thread panicked while holding it
///
/// Unit bodies never run under engine locks, so a poisoned lock can only come
/// from a panic inside the engine's own short critical sections.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the scheduler, its handles, and its workers
///
/// Each structure has its own lock.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    queue: Mutex<TaskQueue>,
    queue_ready: Condvar,
    /// Enqueued but not yet terminal entries (sentinels included)
    outstanding: Mutex<usize>,
    all_done: Condvar,
    failures: Mutex<Vec<Failure>>,
    active_workers: Mutex<usize>,
    workers_exited: Condvar,
}

impl Shared {
    pub(crate) fn push_task(&self, task: Task) {
        // Count first so a fast worker can never complete it before it is counted
        *lock(&self.outstanding) += 1;
        lock(&self.queue).push_task(task);
        self.queue_ready.notify_one();
    }

    fn push_shutdown(&self) {
        *lock(&self.outstanding) += 1;
        lock(&self.queue).push_shutdown();
        self.queue_ready.notify_one();
    }

    /// Block until an entry is available and take it
    pub(crate) fn pop(&self) -> QueueEntry {
        let mut queue = lock(&self.queue);
        loop {
            if let Some(entry) = queue.pop() {
                return entry;
            }
            queue = self
                .queue_ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark one popped entry as terminal
    pub(crate) fn task_done(&self) {
        let mut outstanding = lock(&self.outstanding);
        debug_assert!(*outstanding > 0, "task_done called more times than entries were queued");
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.all_done.notify_all();
        }
    }

    fn wait_all_done(&self) {
        let mut outstanding = lock(&self.outstanding);
        while *outstanding > 0 {
            outstanding = self
                .all_done
                .wait(outstanding)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn outstanding(&self) -> usize {
        *lock(&self.outstanding)
    }

    pub(crate) fn record_failure(&self, failure: Failure) {
        lock(&self.failures).push(failure);
    }

    fn drain_failures(&self) -> Vec<Failure> {
        std::mem::take(&mut *lock(&self.failures))
    }

    fn worker_started(&self) {
        *lock(&self.active_workers) += 1;
    }

    /// Called by a worker that consumed a sentinel (or failed to spawn)
    pub(crate) fn worker_exited(&self) {
        let mut active = lock(&self.active_workers);
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.workers_exited.notify_all();
        }
    }

    fn active_workers(&self) -> usize {
        *lock(&self.active_workers)
    }

    fn wait_workers_exited(&self) {
        let mut active = lock(&self.active_workers);
        while *active > 0 {
            active = self
                .workers_exited
                .wait(active)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Return to the pre-`start` condition
    ///
    /// Units still queued at shutdown are dropped without running.
    fn reset(&self) {
        let dropped = {
            let mut queue = lock(&self.queue);
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        if dropped > 0 {
            tracing::warn!(dropped, "Discarding queued tasks at shutdown");
        }
        *lock(&self.outstanding) = 0;
        self.all_done.notify_all();
        lock(&self.failures).clear();
        *lock(&self.active_workers) = 0;
    }
}

/// Cloneable handle for submitting work and joining on the scheduler
///
/// Handles stay valid across `shutdown()`/`start()` cycles of the scheduler
/// they came from.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// A handle to state no worker pool is attached to
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    /// Enqueue a unit of work; never blocks beyond a short critical section
    pub fn submit(&self, task: Task) {
        tracing::trace!(task = %task, "Submitted");
        self.shared.push_task(task);
    }

    /// Turn `func` into a submit-and-return entry point
    ///
    /// See [`Registered`].
    pub fn register<A, F>(&self, options: TaskOptions<A>, func: F) -> Registered<A>
    where
        A: Serialize + Send + 'static,
        F: Fn(&mut WorkerContext, &A) -> std::result::Result<(), TaskError> + Send + Sync + 'static,
    {
        Registered::new(self.clone(), options, Arc::new(func))
    }

    /// Block until every submitted unit is terminal, then take the failures
    ///
    /// Must not be called from inside a unit: the calling unit is itself
    /// outstanding, so the barrier could never be reached.
    pub fn wait(&self) -> Vec<Failure> {
        self.shared.wait_all_done();
        self.shared.drain_failures()
    }

    /// Number of units enqueued or executing
    pub fn pending(&self) -> usize {
        self.shared.outstanding()
    }
}

/// The task scheduler: shared queue plus a restartable worker pool
///
/// Dropping the scheduler shuts its workers down and discards any units still
/// queued, whether or not it was ever started.
#[derive(Debug)]
pub struct TaskScheduler {
    handle: SchedulerHandle,
    workers: Vec<JoinHandle<()>>,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    /// Create a scheduler with no running workers
    pub fn new() -> Self {
        Self {
            handle: SchedulerHandle {
                shared: Arc::new(Shared::default()),
            },
            workers: Vec::new(),
        }
    }

    /// A cloneable handle for submitters
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Spawn `worker_count` worker threads
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidWorkerCount`] if `worker_count` is zero
    /// - [`Error::AlreadyStarted`] if workers are already running
    /// - [`Error::Io`] if a thread cannot be spawned; workers spawned so far
    ///   are shut down first
    pub fn start(&mut self, worker_count: usize) -> Result<()> {
        if worker_count == 0 {
            return Err(Error::InvalidWorkerCount(worker_count));
        }
        if !self.workers.is_empty() {
            return Err(Error::AlreadyStarted {
                workers: self.workers.len(),
            });
        }

        let width = worker_count.to_string().len();
        for i in 1..=worker_count {
            let name = format!("worker-{i:0width$}");
            let shared = Arc::clone(&self.handle.shared);
            let ctx = WorkerContext::new(name.clone(), self.handle.clone());

            shared.worker_started();
            let spawned = std::thread::Builder::new()
                .name(name)
                .spawn(move || worker::worker_loop(shared, ctx));

            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    self.handle.shared.worker_exited();
                    tracing::error!(error = %e, spawned = self.workers.len(), "Failed to spawn worker thread");
                    self.shutdown();
                    return Err(Error::Io(e));
                }
            }
        }

        tracing::info!(workers = worker_count, "Task scheduler started");
        Ok(())
    }

    /// Start with the worker count from configuration
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn start_with_config(&mut self, config: &SchedulerConfig) -> Result<()> {
        self.start(config.workers)
    }

    /// Stop every worker and reset the scheduler for reuse
    ///
    /// Sends one sentinel per worker. Sentinels sort ahead of all work, so
    /// each idle worker exits as soon as its current unit finishes; units
    /// still queued are discarded, and pending failures are cleared. A
    /// no-op when no workers are running.
    ///
    /// # Panics
    ///
    /// If the number of live workers does not match the number of spawned
    /// threads; that is a scheduler bug and would otherwise hang shutdown.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        let shared = &self.handle.shared;
        assert_eq!(
            shared.active_workers(),
            self.workers.len(),
            "worker count does not match spawned threads"
        );

        tracing::info!(workers = self.workers.len(), "Shutting down task scheduler");
        for _ in 0..self.workers.len() {
            shared.push_shutdown();
        }
        shared.wait_workers_exited();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked outside of a task");
            }
        }

        shared.reset();
        tracing::info!("Task scheduler shut down");
    }

    /// Enqueue a unit of work
    pub fn submit(&self, task: Task) {
        self.handle.submit(task);
    }

    /// Turn `func` into a submit-and-return entry point
    pub fn register<A, F>(&self, options: TaskOptions<A>, func: F) -> Registered<A>
    where
        A: Serialize + Send + 'static,
        F: Fn(&mut WorkerContext, &A) -> std::result::Result<(), TaskError> + Send + Sync + 'static,
    {
        self.handle.register(options, func)
    }

    /// Block until every submitted unit is terminal, then take the failures
    pub fn wait(&self) -> Vec<Failure> {
        self.handle.wait()
    }

    /// Number of running workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether workers are running
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Number of units enqueued or executing
    pub fn pending(&self) -> usize {
        self.handle.pending()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
        // Queued deferred calls may hold handles to this scheduler; without
        // workers nothing else would ever release them
        self.handle.shared.reset();
    }
}
