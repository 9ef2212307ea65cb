use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kentle_exec::{EngineConfig, LogLevel, RunOptions, HOME_ENV_VARS};
use serde::Deserialize;
use tracing::{debug, info};

use crate::args::EngineArgs;

pub const DEFAULT_CONFIG_FILE: &str = "kentle.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub engine: EngineConfig,
    pub run: RunSettings,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub log_level: Option<LogLevel>,
    pub timeout_secs: Option<u64>,
    pub include_general_log: bool,
    pub parameters: BTreeMap<String, String>,
}

impl Settings {
    /// Defaults, then the config file, then `KETTLE_HOME`/`PDI_HOME`, then flags.
    pub fn load(args: &EngineArgs) -> Result<Self, ConfigError> {
        let mut settings = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        match &settings.source {
            Some(path) => info!(config = %path.display(), "loaded config"),
            None => debug!("no config file; using defaults"),
        }
        settings.apply_env();
        settings.apply_args(args);
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    fn apply_env(&mut self) {
        let home = HOME_ENV_VARS
            .iter()
            .filter_map(std::env::var_os)
            .find(|v| !v.is_empty());
        if let Some(home) = home {
            self.engine.home = Some(PathBuf::from(home));
        }
    }

    fn apply_args(&mut self, args: &EngineArgs) {
        if let Some(home) = &args.kettle_home {
            self.engine.home = Some(home.clone());
        }
        if let Some(pan) = &args.pan {
            self.engine.program = Some(pan.clone());
        }
    }

    /// Run options from the file; flags are applied by the caller.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            log_level: self.run.log_level.unwrap_or_default(),
            timeout: self.run.timeout_secs.map(Duration::from_secs),
            parameters: self.run.parameters.clone(),
            include_general_log: self.run.include_general_log,
        }
    }
}
