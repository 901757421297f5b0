use super::*;
use crate::task::Work;
use crate::types::Priority;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Once, OnceLock};
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;


/// Shared log of what ran, in execution order
#[derive(Clone, Default)]
struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

fn priority(value: &str) -> Priority {
    Priority::new(value).unwrap()
}

/// Work that fails its first `fail_first` attempts, counting every attempt
struct Flaky {
    name: String,
    attempts: Arc<AtomicUsize>,
    fail_first: usize,
}

impl Work for Flaky {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn execute(&mut self, _ctx: &mut WorkerContext) -> std::result::Result<(), TaskError> {
        let attempt = self.attempts.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        if attempt <= self.fail_first {
            Err(format!("attempt {attempt} failed").into())
        } else {
            Ok(())
        }
    }
}

fn flaky(name: &str, ttl: u32, fail_first: usize) -> (Task, Arc<AtomicUsize>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let task = Task::new(
        priority("A"),
        ttl,
        Flaky {
            name: name.to_string(),
            attempts: Arc::clone(&attempts),
            fail_first,
        },
    );
    (task, attempts)
}

/// Poll `condition` until it holds or a generous deadline passes
fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Log lines recorded by [`CaptureLayer`]: `(task, level, message)`
type LogLines = Mutex<Vec<(String, tracing::Level, String)>>;

fn log_lines() -> &'static LogLines {
    static LINES: OnceLock<LogLines> = OnceLock::new();
    LINES.get_or_init(Default::default)
}

/// Records every event carrying a `task` field
///
/// Installed as the global default because workers log from their own
/// threads, which a thread-scoped subscriber would not see.
struct CaptureLayer;

#[derive(Default)]
struct EventFields {
    message: Option<String>,
    task: Option<String>,
}

impl tracing::field::Visit for EventFields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            "task" => self.task = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        if let (Some(task), Some(message)) = (fields.task, fields.message) {
            log_lines()
                .lock()
                .unwrap()
                .push((task, *event.metadata().level(), message));
        }
    }
}

fn capture_logs() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let subscriber = tracing_subscriber::registry().with(CaptureLayer);
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}

/// Level and message of every captured event whose task description contains `task`
fn logged_for(task: &str) -> Vec<(tracing::Level, String)> {
    log_lines()
        .lock()
        .unwrap()
        .iter()
        .filter(|(logged, _, _)| logged.contains(task))
        .map(|(_, level, message)| (*level, message.clone()))
        .collect()
}
