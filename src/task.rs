//! Units of work: priority class, retry budget, and the polymorphic execution step

use crate::error::TaskError;
use crate::scheduler::WorkerContext;
use crate::types::{Priority, UnitInfo};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// The action performed by a unit of work
///
/// Implementors provide the body and a description; the retry budget and
/// priority live in the [`Task`] that wraps them.
pub trait Work: Send + 'static {
    /// Short human-readable description (name plus argument summary)
    fn describe(&self) -> String;

    /// Perform one attempt
    ///
    /// Called on a worker thread with that worker's context. Errors and
    /// panics are classified by the scheduler's retry policy and never
    /// escape the worker.
    fn execute(&mut self, ctx: &mut WorkerContext) -> Result<(), TaskError>;

    /// Arguments to report if this unit exhausts its budget
    fn args(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Attempt refused because the retry budget is already spent
#[derive(Debug, thiserror::Error)]
#[error("task has no attempts left")]
pub struct ShouldNotRun;

/// A schedulable, retryable unit of work
pub struct Task {
    priority: Priority,
    ttl: u32,
    retries_remaining: u32,
    work: Box<dyn Work>,
}

impl Task {
    /// Create a unit with a priority class and a retry budget (maximum attempts)
    pub fn new(priority: Priority, ttl: u32, work: impl Work) -> Self {
        Self {
            priority,
            ttl,
            retries_remaining: ttl,
            work: Box::new(work),
        }
    }

    /// Priority class
    pub fn priority(&self) -> &Priority {
        &self.priority
    }

    /// Attempts left
    pub fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    /// Whether another attempt is allowed
    pub fn should_run(&self) -> bool {
        self.retries_remaining > 0
    }

    /// Stable description: `priority=<P>, ttl=<initial budget>. <work description>`
    pub fn description(&self) -> String {
        format!(
            "priority={}, ttl={}. {}",
            self.priority,
            self.ttl,
            self.work.describe()
        )
    }

    /// Arguments carried by the underlying work, if any
    pub fn args(&self) -> Option<serde_json::Value> {
        self.work.args()
    }

    pub(crate) fn info(&self) -> UnitInfo {
        UnitInfo {
            priority: self.priority.clone(),
            retries_remaining: self.retries_remaining,
            description: self.description(),
        }
    }

    /// Spend one attempt and execute the work
    ///
    /// The budget is decremented before the body runs. A panic in the body is
    /// caught and returned as an error.
    pub(crate) fn run(&mut self, ctx: &mut WorkerContext) -> Result<(), TaskError> {
        if !self.should_run() {
            return Err(Box::new(ShouldNotRun));
        }
        self.retries_remaining -= 1;

        let work = &mut self.work;
        match catch_unwind(AssertUnwindSafe(|| work.execute(ctx))) {
            Ok(result) => result,
            Err(payload) => Err(panic_message(payload.as_ref()).into()),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("ttl", &self.ttl)
            .field("retries_remaining", &self.retries_remaining)
            .field("work", &self.work.describe())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
