//! Scriptable engine double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{
    BootstrapError, Engine, EngineError, EngineInfo, EngineOutcome, ExecutionRequest, StepStatus,
};
use crate::log::{LogLevel, LogWriter};

/// Engine that replays a fixed script instead of running anything.
///
/// Counts how often it was bootstrapped and executed, and remembers the last
/// request, so tests can check how the runner drove it.
#[derive(Default)]
pub struct MockEngine {
    lines: Vec<(LogLevel, String)>,
    steps: Vec<StepStatus>,
    nr_errors: Option<u64>,
    exit_code: i32,
    delay: Option<Duration>,
    bootstrap_failure: Option<String>,
    rejection: Option<(i32, &'static str)>,
    bootstrap_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    last_request: Mutex<Option<ExecutionRequest>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, level: LogLevel, text: impl Into<String>) -> Self {
        self.lines.push((level, text.into()));
        self
    }

    /// Adds a finished step; its `errors` count towards the run's total.
    pub fn with_step(mut self, step: StepStatus) -> Self {
        self.steps.push(step);
        self
    }

    /// Overrides the error total that would otherwise be summed from steps.
    pub fn with_errors(mut self, nr_errors: u64) -> Self {
        self.nr_errors = Some(nr_errors);
        if self.exit_code == 0 && nr_errors > 0 {
            self.exit_code = 1;
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_bootstrap(mut self, reason: impl Into<String>) -> Self {
        self.bootstrap_failure = Some(reason.into());
        self
    }

    pub fn rejecting(mut self, code: i32, reason: &'static str) -> Self {
        self.rejection = Some((code, reason));
        self
    }

    pub fn bootstrap_calls(&self) -> usize {
        self.bootstrap_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ExecutionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn bootstrap(&self) -> Result<EngineInfo, BootstrapError> {
        self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.bootstrap_failure {
            return Err(BootstrapError::Engine {
                engine: self.name().to_string(),
                reason: reason.clone(),
            });
        }
        Ok(EngineInfo {
            engine: self.name().to_string(),
            launcher: None,
            home: None,
            plugin_count: 0,
            version: None,
        })
    }

    async fn execute(
        &self,
        request: ExecutionRequest,
        log: LogWriter,
    ) -> Result<EngineOutcome, EngineError> {
        if self.bootstrap_calls() == 0 {
            return Err(EngineError::NotBootstrapped);
        }
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request);

        for (level, text) in &self.lines {
            log.log(*level, text.clone()).await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((code, reason)) = self.rejection {
            return Err(EngineError::Rejected { code, reason });
        }

        let nr_errors = self
            .nr_errors
            .unwrap_or_else(|| self.steps.iter().map(|s| s.errors).sum());
        let exit_code = if nr_errors > 0 && self.exit_code == 0 {
            1
        } else {
            self.exit_code
        };
        Ok(EngineOutcome {
            exit_code: Some(exit_code),
            nr_errors,
            steps: self.steps.clone(),
        })
    }
}
