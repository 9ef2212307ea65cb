#![forbid(unsafe_code)]

//! Running Kettle transformations.
//!
//! An [`Environment`] bootstraps an [`Engine`] once; [`Job`]s built from it
//! are started, awaited and reported on, usually through a [`Runner`].

pub mod engine;
mod environment;
pub mod events;
pub mod job;
pub mod log;
mod report;
mod runner;

pub use crate::engine::{
    BootstrapError, Engine, EngineConfig, EngineError, EngineInfo, EngineOutcome,
    ExecutionRequest, MockEngine, PanEngine, StepStatus, HOME_ENV_VARS,
};
pub use crate::environment::Environment;
pub use crate::events::{CollectingEventSink, EventSink, NoOpEventSink, RunEvent, StdoutEventSink};
pub use crate::job::{
    FinishedJob, Job, JobError, JobResult, JobSource, JobStatus, RepositoryLocation, RunningJob,
};
pub use crate::log::{LogChannelId, LogLevel, LogLine, LogStore, LogWriter};
pub use crate::report::{completion_line, LogReport, LOG_BANNER_WIDTH};
pub use crate::runner::{RunError, RunOptions, Runner};
