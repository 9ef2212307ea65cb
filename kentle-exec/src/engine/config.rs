use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables consulted, in order, when no home is configured.
pub const HOME_ENV_VARS: [&str; 2] = ["KETTLE_HOME", "PDI_HOME"];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Kettle installation directory (the one holding `pan.sh` and `plugins/`).
    pub home: Option<PathBuf>,
    /// Explicit launcher, overriding `<home>/pan.sh`.
    pub program: Option<PathBuf>,
    /// Arguments placed before pan's own, e.g. a script path when the
    /// launcher is an interpreter.
    pub program_args: Vec<String>,
    /// Extra environment for the engine process.
    pub env: BTreeMap<String, String>,
    /// Run `pan -version` during bootstrap.
    pub version_check: bool,
    pub version_check_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home: None,
            program: None,
            program_args: Vec::new(),
            env: BTreeMap::new(),
            version_check: false,
            version_check_timeout_ms: 5000,
        }
    }
}

impl EngineConfig {
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_program_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn version_check_timeout(&self) -> Duration {
        Duration::from_millis(self.version_check_timeout_ms)
    }

    /// Configured home, else the first non-empty of `KETTLE_HOME`/`PDI_HOME`.
    pub fn resolve_home(&self) -> Option<PathBuf> {
        self.home.clone().or_else(|| {
            HOME_ENV_VARS
                .iter()
                .filter_map(|var| std::env::var_os(var))
                .find(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }

    pub fn resolve_launcher(&self, home: Option<&Path>) -> Option<PathBuf> {
        self.program
            .clone()
            .or_else(|| home.map(|h| h.join(launcher_file_name())))
    }
}

pub fn launcher_file_name() -> &'static str {
    if cfg!(windows) {
        "Pan.bat"
    } else {
        "pan.sh"
    }
}
