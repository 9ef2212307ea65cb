use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::job::JobSource;

pub const ATTEMPT_BANNER_WIDTH: usize = 87;

#[derive(Debug, Clone)]
pub enum RunEvent {
    Attempting { source: String, origin: String },
    Starting { source: String },
    Finished { source: String, nr_errors: u64 },
    Failed { source: String, error: String },
}

impl RunEvent {
    pub(crate) fn attempting(source: &JobSource) -> Self {
        RunEvent::Attempting {
            source: source.to_string(),
            origin: source.origin(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::Attempting { .. } => "attempting",
            RunEvent::Starting { .. } => "starting",
            RunEvent::Finished { .. } => "finished",
            RunEvent::Failed { .. } => "failed",
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: RunEvent);
}

/// Prints the attempt and start banners on stdout.
pub struct StdoutEventSink;

impl StdoutEventSink {
    pub fn render(event: &RunEvent) -> Option<String> {
        match event {
            RunEvent::Attempting { source, origin } => {
                let banner = "*".repeat(ATTEMPT_BANNER_WIDTH);
                Some(format!(
                    "{banner}\nAttempting to run transformation {source} {origin}\n{banner}\n"
                ))
            }
            RunEvent::Starting { .. } => Some("\nStarting transformation".to_string()),
            // The report carries the outcome; failures go to stderr via tracing.
            RunEvent::Finished { .. } | RunEvent::Failed { .. } => None,
        }
    }
}

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: RunEvent) {
        if let Some(text) = Self::render(&event) {
            println!("{text}");
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: RunEvent) {}
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(RunEvent::kind).collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
