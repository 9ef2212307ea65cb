use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kentle_core::{display_chain, parse_definition_file, validate_definition, ParseError, ValidationError};
use tracing::{error, info};

use crate::environment::Environment;
use crate::events::{EventSink, NoOpEventSink, RunEvent};
use crate::job::{FinishedJob, Job, JobError, JobSource, RepositoryLocation};
use crate::log::LogLevel;
use crate::report::LogReport;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub log_level: LogLevel,
    pub timeout: Option<Duration>,
    pub parameters: BTreeMap<String, String>,
    /// Merge environment lines (bootstrap and such) into the report.
    pub include_general_log: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("could not load transformation")]
    Parse(#[from] ParseError),
    #[error("transformation is not valid")]
    Validation(#[from] ValidationError),
    #[error("transformation did not run to completion")]
    Job(#[from] JobError),
}

/// Runs transformations against a bootstrapped [`Environment`].
pub struct Runner {
    env: Environment,
    options: RunOptions,
    sink: Arc<dyn EventSink>,
}

impl Runner {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            options: RunOptions::default(),
            sink: Arc::new(NoOpEventSink),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Loads the transformation at `path`, runs it and waits for it to finish.
    pub async fn run_from_file(&self, path: impl AsRef<Path>) -> Result<FinishedJob, RunError> {
        let path = path.as_ref();
        let source = JobSource::file(path);
        self.sink.emit(RunEvent::attempting(&source)).await;

        let result = self.load_and_run(path).await;
        self.settle(&source, result).await
    }

    /// Runs a transformation stored in a repository. The engine loads the
    /// definition itself, so parameters are passed through unchecked.
    pub async fn run_from_repository(
        &self,
        location: RepositoryLocation,
    ) -> Result<FinishedJob, RunError> {
        let source = JobSource::Repository(location);
        self.sink.emit(RunEvent::attempting(&source)).await;

        let job = Job::new(&self.env, source.clone());
        let result = self.run_job(job).await;
        self.settle(&source, result).await
    }

    async fn load_and_run(&self, path: &Path) -> Result<FinishedJob, RunError> {
        let definition = parse_definition_file(path)?;
        validate_definition(&definition)?;
        info!(
            transformation = definition.name(),
            steps = definition.steps.len(),
            "loaded transformation"
        );
        let job = Job::from_definition(&self.env, path, definition);
        self.run_job(job).await
    }

    async fn run_job(&self, mut job: Job) -> Result<FinishedJob, RunError> {
        for (name, value) in &self.options.parameters {
            job.set_parameter_value(name, value)?;
        }
        job.set_log_level(self.options.log_level);

        self.sink
            .emit(RunEvent::Starting {
                source: job.source().to_string(),
            })
            .await;
        let finished = job.start().wait_until_finished(self.options.timeout).await?;
        Ok(finished)
    }

    async fn settle(
        &self,
        source: &JobSource,
        result: Result<FinishedJob, RunError>,
    ) -> Result<FinishedJob, RunError> {
        match &result {
            Ok(job) => {
                self.sink
                    .emit(RunEvent::Finished {
                        source: source.to_string(),
                        nr_errors: job.result().nr_errors,
                    })
                    .await;
            }
            Err(e) => {
                let chain = display_chain(e);
                error!(source = %source, error = %chain, "transformation run failed");
                if let RunError::Validation(v) = e {
                    for violation in &v.violations {
                        error!(source = %source, "{violation}");
                    }
                }
                self.sink
                    .emit(RunEvent::Failed {
                        source: source.to_string(),
                        error: chain,
                    })
                    .await;
            }
        }
        result
    }

    pub async fn log_report(&self, job: &FinishedJob) -> LogReport {
        LogReport::collect(job, self.env.log_store(), self.options.include_general_log).await
    }

    /// Writes the completion line of `job` followed by its banner-framed log.
    pub async fn report(&self, job: &FinishedJob, out: &mut impl Write) -> io::Result<()> {
        self.log_report(job).await.write_to(out)
    }
}
