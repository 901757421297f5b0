//! Common test utilities for crawl-tasks integration tests

use std::sync::{Arc, Mutex};

/// Thread-safe log of events recorded by units of work
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl Recorder {
    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn sorted(&self) -> Vec<String> {
        let mut events = self.events();
        events.sort();
        events
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }
}

/// Install a test log subscriber once; honors `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crawl_tasks=warn".into()),
        )
        .with_test_writer()
        .try_init();
}
