//! The seam between this crate and the external Kettle engine.

mod config;
pub mod mock;
mod pan;
pub mod summary;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::job::JobSource;
use crate::log::{LogLevel, LogWriter};

pub use config::{EngineConfig, HOME_ENV_VARS};
pub use mock::MockEngine;
pub use pan::PanEngine;

#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Process-wide setup of the engine. Calling it again returns the
    /// information gathered by the first successful call.
    async fn bootstrap(&self) -> Result<EngineInfo, BootstrapError>;

    /// Runs one transformation to completion, appending every log line the
    /// engine produces to `log`.
    async fn execute(
        &self,
        request: ExecutionRequest,
        log: LogWriter,
    ) -> Result<EngineOutcome, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EngineInfo {
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launcher: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
    pub plugin_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub source: JobSource,
    pub log_level: LogLevel,
    /// Values for declared named parameters; absent ones keep their defaults.
    pub parameters: BTreeMap<String, String>,
}

/// What the engine reported once the transformation reached a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutcome {
    pub exit_code: Option<i32>,
    pub nr_errors: u64,
    pub steps: Vec<StepStatus>,
}

/// Row counters of one step copy, as logged when it finished processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StepStatus {
    pub step: String,
    pub copy: u32,
    pub lines_input: u64,
    pub lines_output: u64,
    pub lines_read: u64,
    pub lines_written: u64,
    pub lines_updated: u64,
    pub errors: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("no Kettle installation configured (set engine.home, KETTLE_HOME or PDI_HOME, or engine.program)")]
    NoInstallation,
    #[error("pan launcher not found at {}", path.display())]
    LauncherNotFound { path: PathBuf },
    #[error("Kettle plugin directory not found at {}", path.display())]
    PluginsMissing { path: PathBuf },
    #[error("failed to scan plugins in {}", path.display())]
    PluginScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start {} to check the engine version", launcher.display())]
    VersionCheck {
        launcher: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("engine version check did not finish within {timeout:?}")]
    VersionCheckTimedOut { timeout: Duration },
    #[error("engine version check exited with status {code:?}")]
    VersionCheckFailed { code: Option<i32> },
    #[error("{engine} engine failed to initialise: {reason}")]
    Engine { engine: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine was used before it was bootstrapped")]
    NotBootstrapped,
    #[error("failed to start {}", launcher.display())]
    Spawn {
        launcher: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while reading engine output")]
    Io(#[from] std::io::Error),
    #[error("engine rejected the transformation (exit code {code}): {reason}")]
    Rejected { code: i32, reason: &'static str },
    #[error("engine process was terminated by a signal")]
    Terminated,
}
