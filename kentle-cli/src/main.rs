use std::io::IsTerminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod config;
mod exit_codes;
mod output;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "kentle", version, about = "Runs Kettle transformations")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,
    #[command(flatten)]
    output: OutputArgs,
    /// Defaults to `run etl/Madeira.ktr`
    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli));
    std::process::exit(exit_code);
}

async fn run_command(cli: Cli) -> i32 {
    let Cli {
        engine,
        output,
        command,
    } = cli;
    match command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => cmd::run::run_cmd(args, &engine, &output).await,
        Command::Inspect { path } => cmd::inspect::inspect_cmd(&path, &output),
        Command::Validate { path } => cmd::validate::validate_cmd(&path, &output),
        Command::Doctor => cmd::doctor::doctor_cmd(&engine, &output).await,
    }
}
