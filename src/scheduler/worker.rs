//! Worker threads: the drain loop, retry policy, and per-worker context.

use super::queue::QueueEntry;
use super::{SchedulerHandle, Shared};
use crate::error::error_chain;
use crate::task::Task;
use crate::types::{Failure, UnitInfo};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-worker execution context
///
/// Each worker thread owns exactly one context for its whole life and passes
/// it to every unit it executes. The scratch space is worker-affine, not
/// unit-affine: values written by one unit are visible to later, unrelated
/// units on the same worker, and are gone after shutdown.
pub struct WorkerContext {
    name: String,
    handle: SchedulerHandle,
    current: Option<UnitInfo>,
    scratch: Option<Scratch>,
}

impl WorkerContext {
    pub(crate) fn new(name: String, handle: SchedulerHandle) -> Self {
        Self {
            name,
            handle,
            current: None,
            scratch: None,
        }
    }

    /// Name of the worker thread owning this context
    pub fn worker_name(&self) -> &str {
        &self.name
    }

    /// The unit this worker is currently executing
    ///
    /// `None` outside of a unit's execution.
    pub fn current_unit(&self) -> Option<&UnitInfo> {
        self.current.as_ref()
    }

    /// Worker-local scratch space, created on first use
    pub fn scratch(&mut self) -> &mut Scratch {
        self.scratch.get_or_insert_with(Scratch::default)
    }

    /// Handle to the scheduler this worker belongs to
    pub fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }

    /// Submit a further unit of work from inside a running unit
    pub fn submit(&self, task: Task) {
        self.handle.submit(task);
    }
}

/// Typed key/value cache owned by one worker
///
/// Intended for expensive, reusable per-thread resources such as HTTP
/// clients. Callers must tolerate absence on first use per worker.
#[derive(Default)]
pub struct Scratch {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl Scratch {
    /// Borrow the value under `key` if it exists and has type `T`
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Mutably borrow the value under `key` if it exists and has type `T`
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn insert<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Remove the value under `key`; returns whether one was present
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Whether a value of any type is stored under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the scratch space is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the `T` under `key`, initializing it with `init` if missing or of another type
    pub fn get_or_insert_with<T, F>(&mut self, key: &str, init: F) -> &mut T
    where
        T: Any + Send,
        F: FnOnce() -> T,
    {
        match self.get_or_try_insert_with(key, || Ok::<T, std::convert::Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with) for fallible initializers
    ///
    /// # Errors
    ///
    /// Returns the initializer's error; nothing is stored in that case.
    pub fn get_or_try_insert_with<T, E, F>(&mut self, key: &str, init: F) -> Result<&mut T, E>
    where
        T: Any + Send,
        F: FnOnce() -> Result<T, E>,
    {
        let present = self.values.get(key).is_some_and(|v| v.is::<T>());
        if !present {
            self.values.insert(key.to_string(), Box::new(init()?));
        }
        match self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>()) {
            Some(value) => Ok(value),
            None => unreachable!("scratch slot {key} holds the requested type"),
        }
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Main worker loop
///
/// Pops entries until it receives the shutdown sentinel. Every popped entry,
/// sentinel included, is marked done exactly once.
pub(crate) fn worker_loop(shared: Arc<Shared>, mut ctx: WorkerContext) {
    tracing::debug!(worker = %ctx.name, "Worker started");

    loop {
        match shared.pop() {
            QueueEntry::Shutdown => {
                ctx.current = None;
                shared.task_done();
                shared.worker_exited();
                tracing::debug!(worker = %ctx.name, "Worker shut down");
                break;
            }
            QueueEntry::Work { task, .. } => {
                ctx.current = Some(task.info());
                run_with_retry(&shared, task, &mut ctx);
                ctx.current = None;
                shared.task_done();
            }
        }
    }
}

/// Execute one attempt and apply the retry policy to its outcome
fn run_with_retry(shared: &Shared, mut task: Task, ctx: &mut WorkerContext) {
    let description = task.description();
    tracing::info!(worker = %ctx.name, task = %description, "Doing");

    match task.run(ctx) {
        Ok(()) => {
            tracing::info!(worker = %ctx.name, task = %description, "Done");
        }
        Err(err) => {
            let detail = error_chain(err.as_ref());
            if task.should_run() {
                tracing::warn!(
                    worker = %ctx.name,
                    task = %description,
                    error = %detail,
                    retries_remaining = task.retries_remaining(),
                    "Retry later"
                );
                // Re-enqueue before this attempt is marked done so the
                // outstanding count never touches zero in between
                shared.push_task(task);
            } else {
                tracing::error!(
                    worker = %ctx.name,
                    task = %description,
                    error = %detail,
                    "Failed"
                );
                shared.record_failure(Failure {
                    description,
                    error: detail,
                    args: task.args(),
                });
            }
        }
    }
}
