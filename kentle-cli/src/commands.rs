use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a transformation and print its log report
    Run(RunArgs),
    /// Show parameters, steps and hops of a transformation
    Inspect { path: PathBuf },
    /// Parse and validate a transformation without running it
    Validate { path: PathBuf },
    /// Bootstrap the engine and report what was found
    Doctor,
}
