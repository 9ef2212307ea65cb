//! A single run of a transformation.
//!
//! The lifecycle is encoded in three types: a [`Job`] can be configured,
//! [`Job::start`] turns it into a [`RunningJob`], and waiting on that yields
//! a [`FinishedJob`] carrying the [`JobResult`].

mod result;
mod source;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use kentle_core::Definition;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::{EngineError, EngineOutcome, ExecutionRequest};
use crate::environment::Environment;
use crate::log::{LogChannelId, LogLevel, LogWriter};

pub use result::{JobResult, JobStatus};
pub use source::{JobSource, RepositoryLocation};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("transformation {transformation:?} declares no parameter named {name:?}")]
    UnknownParameter { transformation: String, name: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("transformation did not finish within {limit:?} and was stopped")]
    TimedOut { limit: Duration },
    #[error("transformation was stopped before it finished")]
    Stopped,
    #[error("engine task failed: {0}")]
    Join(String),
}

pub struct Job {
    env: Environment,
    source: JobSource,
    definition: Option<Arc<Definition>>,
    log_level: LogLevel,
    parameters: BTreeMap<String, String>,
    log_channel: LogChannelId,
}

impl Job {
    pub fn new(env: &Environment, source: JobSource) -> Self {
        Self {
            env: env.clone(),
            source,
            definition: None,
            log_level: LogLevel::default(),
            parameters: BTreeMap::new(),
            log_channel: LogChannelId::new(),
        }
    }

    pub fn from_definition(
        env: &Environment,
        path: impl Into<PathBuf>,
        definition: Definition,
    ) -> Self {
        let mut job = Self::new(env, JobSource::file(path));
        job.definition = Some(Arc::new(definition));
        job
    }

    pub fn source(&self) -> &JobSource {
        &self.source
    }

    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_deref()
    }

    pub fn log_channel_id(&self) -> LogChannelId {
        self.log_channel
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Declared parameters; empty when the definition is not known locally.
    pub fn list_parameters(&self) -> Vec<&str> {
        self.definition
            .as_deref()
            .map(|d| d.list_parameters().collect())
            .unwrap_or_default()
    }

    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Sets a named parameter. With a locally parsed definition the name
    /// must be one it declares.
    pub fn set_parameter_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), JobError> {
        let name = name.into();
        if let Some(def) = &self.definition {
            if def.parameter(&name).is_none() {
                return Err(JobError::UnknownParameter {
                    transformation: def.name().to_string(),
                    name,
                });
            }
        }
        self.parameters.insert(name, value.into());
        Ok(())
    }

    /// Hands the job to the engine and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> RunningJob {
        let Job {
            env,
            source,
            definition,
            log_level,
            parameters,
            log_channel,
        } = self;

        info!(
            source = %source,
            channel = %log_channel,
            level = %log_level,
            "starting transformation"
        );
        let request = ExecutionRequest {
            source: source.clone(),
            log_level,
            parameters,
        };
        let log = LogWriter::new(env.log_store().clone(), log_channel, log_level);
        let engine = env.engine().clone();
        let handle = tokio::spawn(async move { engine.execute(request, log).await });

        RunningJob {
            handle,
            meta: JobMeta {
                source,
                definition,
                log_channel,
                started_at: Utc::now(),
                clock: Instant::now(),
            },
        }
    }
}

struct JobMeta {
    source: JobSource,
    definition: Option<Arc<Definition>>,
    log_channel: LogChannelId,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl JobMeta {
    fn finish(self, outcome: EngineOutcome) -> FinishedJob {
        let result = JobResult::from_outcome(outcome, self.started_at, self.clock.elapsed());
        info!(
            source = %self.source,
            errors = result.nr_errors,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "transformation finished"
        );
        FinishedJob {
            source: self.source,
            definition: self.definition,
            log_channel: self.log_channel,
            result,
        }
    }
}

/// A job the engine is executing.
pub struct RunningJob {
    handle: JoinHandle<Result<EngineOutcome, EngineError>>,
    meta: JobMeta,
}

impl RunningJob {
    pub fn log_channel_id(&self) -> LogChannelId {
        self.meta.log_channel
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Asks the engine to stop; the engine process is killed.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Waits until the engine reports a terminal state. When `timeout`
    /// expires first the job is stopped and [`JobError::TimedOut`] returned.
    pub async fn wait_until_finished(
        self,
        timeout: Option<Duration>,
    ) -> Result<FinishedJob, JobError> {
        let RunningJob { mut handle, meta } = self;

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    // The engine process is killed when the aborted task is dropped.
                    let _ = handle.await;
                    warn!(source = %meta.source, ?limit, "transformation timed out; stopping it");
                    return Err(JobError::TimedOut { limit });
                }
            },
            None => handle.await,
        };

        let outcome = match joined {
            Ok(outcome) => outcome?,
            Err(e) if e.is_cancelled() => return Err(JobError::Stopped),
            Err(e) => return Err(JobError::Join(e.to_string())),
        };
        Ok(meta.finish(outcome))
    }
}

/// A job that reached its terminal state.
#[derive(Debug, Clone)]
pub struct FinishedJob {
    source: JobSource,
    definition: Option<Arc<Definition>>,
    log_channel: LogChannelId,
    result: JobResult,
}

impl FinishedJob {
    pub fn source(&self) -> &JobSource {
        &self.source
    }

    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_deref()
    }

    pub fn log_channel_id(&self) -> LogChannelId {
        self.log_channel
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }
}
