//! Deferred calls: a function plus its arguments packaged as a unit of work

use crate::error::TaskError;
use crate::scheduler::WorkerContext;
use crate::task::{Task, Work};
use crate::types::Priority;
use crate::utils::format_kwargs;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Body of a deferred call
pub type TaskFn<A> = dyn Fn(&mut WorkerContext, &A) -> Result<(), TaskError> + Send + Sync;

/// Custom argument summary used in task descriptions
pub type ArgsFormatter<A> = dyn Fn(&A) -> String + Send + Sync;

/// How deferred calls of one function are scheduled and described
///
/// # Example
///
/// ```
/// use crawl_tasks::func_task::TaskOptions;
/// use crawl_tasks::Priority;
///
/// # fn main() -> crawl_tasks::Result<()> {
/// let options = TaskOptions::<String>::new("crawl_course")
///     .priority(Priority::new("B")?)
///     .ttl(3)
///     .format_args(|slug| format!("course={slug}"));
/// assert_eq!(options.ttl_value(), 3);
/// # Ok(())
/// # }
/// ```
pub struct TaskOptions<A> {
    name: String,
    priority: Priority,
    ttl: u32,
    desc: Option<String>,
    format_args: Option<Arc<ArgsFormatter<A>>>,
}

impl<A> TaskOptions<A> {
    /// Options for a function called `name`, priority `"A"`, one attempt
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: Priority::default(),
            ttl: 1,
            desc: None,
            format_args: None,
        }
    }

    /// Set the priority class
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the retry budget (maximum attempts)
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Describe calls with `desc` instead of the function name
    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Replace the default `key=value` argument summary
    pub fn format_args<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&A) -> String + Send + Sync + 'static,
    {
        self.format_args = Some(Arc::new(formatter));
        self
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority class
    pub fn priority_value(&self) -> &Priority {
        &self.priority
    }

    /// Retry budget
    pub fn ttl_value(&self) -> u32 {
        self.ttl
    }
}

impl<A> Clone for TaskOptions<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            priority: self.priority.clone(),
            ttl: self.ttl,
            desc: self.desc.clone(),
            format_args: self.format_args.clone(),
        }
    }
}

impl<A> fmt::Debug for TaskOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("ttl", &self.ttl)
            .field("desc", &self.desc)
            .field("format_args", &self.format_args.is_some())
            .finish()
    }
}

/// A deferred call of `func(ctx, &args)`
///
/// The description is computed once at construction and reused for every
/// log line and failure report.
pub struct FuncTask<A> {
    func: Arc<TaskFn<A>>,
    args: A,
    priority: Priority,
    ttl: u32,
    description: String,
}

impl<A> FuncTask<A>
where
    A: Serialize + Send + 'static,
{
    /// Package a call of `func` with `args`
    pub fn new(func: Arc<TaskFn<A>>, args: A, options: &TaskOptions<A>) -> Self {
        let label = options.desc.as_deref().unwrap_or(&options.name);
        let summary = match &options.format_args {
            Some(formatter) => formatter(&args),
            None => format_kwargs(&args),
        };
        let description = if summary.is_empty() {
            label.to_string()
        } else {
            format!("{label}: {summary}")
        };

        Self {
            func,
            args,
            priority: options.priority.clone(),
            ttl: options.ttl,
            description,
        }
    }

    /// The arguments this call will be made with
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Wrap into a schedulable [`Task`] with the configured priority and budget
    pub fn into_task(self) -> Task {
        let priority = self.priority.clone();
        let ttl = self.ttl;
        Task::new(priority, ttl, self)
    }
}

impl<A> Work for FuncTask<A>
where
    A: Serialize + Send + 'static,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn execute(&mut self, ctx: &mut WorkerContext) -> Result<(), TaskError> {
        (self.func)(ctx, &self.args)
    }

    fn args(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.args).ok()
    }
}
