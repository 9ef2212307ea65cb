use std::path::PathBuf;

use clap::Args;
use kentle_exec::LogLevel;

use crate::output::OutputFormat;

/// Transformation run when no subcommand is given.
pub const DEFAULT_TRANSFORMATION: &str = "etl/Madeira.ktr";

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Configuration file (defaults to ./kentle.yaml when present)
    #[arg(long, env = "KENTLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    /// Kettle installation directory
    #[arg(long, global = true)]
    pub kettle_home: Option<PathBuf>,
    /// Launcher to use instead of <kettle-home>/pan.sh
    #[arg(long = "pan", value_name = "PROGRAM", global = true)]
    pub pan: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[arg(default_value = DEFAULT_TRANSFORMATION)]
    pub path: PathBuf,
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,
    #[arg(long)]
    pub level: Option<LogLevel>,
    /// Stop the transformation after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Include engine bootstrap lines in the log report
    #[arg(long)]
    pub include_general_log: bool,
    #[command(flatten)]
    pub repository: RepositoryArgs,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TRANSFORMATION),
            params: Vec::new(),
            level: None,
            timeout: None,
            include_general_log: false,
            repository: RepositoryArgs::default(),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct RepositoryArgs {
    /// Load the transformation from this repository instead of a file
    #[arg(long = "rep", value_name = "NAME", requires = "transformation")]
    pub repository: Option<String>,
    #[arg(long, default_value = "/")]
    pub dir: String,
    #[arg(long = "trans", value_name = "NAME", requires = "repository")]
    pub transformation: Option<String>,
    #[arg(long, requires = "repository")]
    pub user: Option<String>,
    #[arg(
        long,
        env = "KENTLE_REPOSITORY_PASSWORD",
        hide_env_values = true,
        requires = "repository"
    )]
    pub password: Option<String>,
}

impl Default for RepositoryArgs {
    fn default() -> Self {
        Self {
            repository: None,
            dir: "/".to_string(),
            transformation: None,
            user: None,
            password: None,
        }
    }
}
