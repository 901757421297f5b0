//! Submission facade: calling a registered function enqueues it instead of running it.

use super::SchedulerHandle;
use crate::func_task::{FuncTask, TaskFn, TaskOptions};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A function bound to a scheduler
///
/// [`call`](Self::call) packages the arguments into a deferred call with the
/// registered priority and budget, submits it, and returns immediately.
/// Produced by [`SchedulerHandle::register`] or
/// [`TaskScheduler::register`](super::TaskScheduler::register).
pub struct Registered<A> {
    handle: SchedulerHandle,
    options: TaskOptions<A>,
    func: Arc<TaskFn<A>>,
}

impl<A> Registered<A>
where
    A: Serialize + Send + 'static,
{
    pub(crate) fn new(handle: SchedulerHandle, options: TaskOptions<A>, func: Arc<TaskFn<A>>) -> Self {
        Self {
            handle,
            options,
            func,
        }
    }

    /// Submit a call with `args`; never runs the function synchronously
    pub fn call(&self, args: A) {
        let task = FuncTask::new(Arc::clone(&self.func), args, &self.options).into_task();
        self.handle.submit(task);
    }

    /// Scheduling options calls are made with
    pub fn options(&self) -> &TaskOptions<A> {
        &self.options
    }

    /// The scheduler calls are submitted to
    pub fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl<A> Clone for Registered<A> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            options: self.options.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A> fmt::Debug for Registered<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
