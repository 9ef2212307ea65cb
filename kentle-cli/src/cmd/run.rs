use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use kentle_core::display_chain;
use kentle_exec::{
    EngineInfo, Environment, EventSink, FinishedJob, JobResult, LogReport, NoOpEventSink,
    PanEngine, RepositoryLocation, RunError, RunOptions, Runner, StdoutEventSink,
};
use secrecy::SecretString;
use serde::Serialize;

use crate::config::Settings;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{EngineArgs, OutputArgs, RepositoryArgs, RunArgs};

#[derive(Serialize)]
struct RunSummary<'a> {
    #[serde(flatten)]
    report: &'a LogReport,
    completion: String,
    result: &'a JobResult,
    engine: &'a EngineInfo,
}

pub async fn run_cmd(args: RunArgs, engine: &EngineArgs, output: &OutputArgs) -> i32 {
    let settings = match Settings::load(engine) {
        Ok(s) => s,
        Err(e) => {
            print_error(output.format, output.quiet, &display_chain(&e));
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let options = match run_options(&settings, &args) {
        Ok(o) => o,
        Err(message) => {
            print_error(output.format, output.quiet, &message);
            return exit_codes::VALIDATION_FAILED;
        }
    };

    // Bootstrap failures are logged by the environment itself.
    let env = match Environment::init_global(Arc::new(PanEngine::new(settings.engine))).await {
        Ok(env) => env,
        Err(e) => {
            if output.format == OutputFormat::Json {
                print_error(output.format, output.quiet, &display_chain(&e));
            }
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let sink: Arc<dyn EventSink> = if output.format == OutputFormat::Text && !output.quiet {
        Arc::new(StdoutEventSink)
    } else {
        Arc::new(NoOpEventSink)
    };
    let runner = Runner::new(env).with_options(options).with_sink(sink);

    let outcome = match repository_location(args.repository) {
        Some(location) => runner.run_from_repository(location).await,
        None => runner.run_from_file(&args.path).await,
    };
    match outcome {
        Ok(job) => finish(&runner, &job, output).await,
        Err(e) => {
            if output.format == OutputFormat::Json {
                print_error(output.format, output.quiet, &display_chain(&e));
            }
            match e {
                RunError::Parse(_) | RunError::Validation(_) => exit_codes::VALIDATION_FAILED,
                RunError::Job(_) => exit_codes::RUN_FAILED,
            }
        }
    }
}

async fn finish(runner: &Runner, job: &FinishedJob, output: &OutputArgs) -> i32 {
    if !output.quiet {
        match output.format {
            OutputFormat::Text => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = runner.report(job, &mut stdout).await {
                    eprintln!("error: failed to write log report: {e}");
                    return exit_codes::RUNTIME_ERROR;
                }
            }
            OutputFormat::Json => {
                let report = runner.log_report(job).await;
                let summary = RunSummary {
                    report: &report,
                    completion: report.completion_line(),
                    result: job.result(),
                    engine: runner.environment().engine_info(),
                };
                print_result(output.format, output.quiet, &summary);
            }
        }
    }

    if job.result().is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUN_FAILED
    }
}

fn run_options(settings: &Settings, args: &RunArgs) -> Result<RunOptions, String> {
    let mut options = settings.run_options();
    if let Some(level) = args.level {
        options.log_level = level;
    }
    if let Some(secs) = args.timeout {
        options.timeout = Some(Duration::from_secs(secs));
    }
    options.include_general_log |= args.include_general_log;
    options.parameters.extend(parse_params(&args.params)?);
    Ok(options)
}

fn parse_params(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    raw.iter()
        .map(|s| match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => Err(format!("invalid --param {s:?}: expected NAME=VALUE")),
        })
        .collect()
}

fn repository_location(args: RepositoryArgs) -> Option<RepositoryLocation> {
    let RepositoryArgs {
        repository,
        dir,
        transformation,
        user,
        password,
    } = args;
    Some(RepositoryLocation {
        repository: repository?,
        directory: dir,
        transformation: transformation?,
        username: user,
        password: password.map(SecretString::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_split_on_the_first_equals() {
        let params = parse_params(&["ROW_LIMIT=5".to_string(), "FILTER=a=b".to_string()]).unwrap();
        assert_eq!(params["ROW_LIMIT"], "5");
        assert_eq!(params["FILTER"], "a=b");
    }

    #[test]
    fn params_need_a_name() {
        assert!(parse_params(&["=5".to_string()]).is_err());
        assert!(parse_params(&["ROW_LIMIT".to_string()]).is_err());
    }

    #[test]
    fn flags_override_file_run_settings() {
        let mut settings = Settings::default();
        settings.run.timeout_secs = Some(600);
        settings
            .run
            .parameters
            .insert("ROW_LIMIT".to_string(), "10".to_string());
        let args = RunArgs {
            timeout: Some(5),
            params: vec!["ROW_LIMIT=99".to_string()],
            ..RunArgs::default()
        };
        let options = run_options(&settings, &args).unwrap();
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.parameters["ROW_LIMIT"], "99");
    }

    #[test]
    fn repository_needs_name_and_transformation() {
        assert!(repository_location(RepositoryArgs::default()).is_none());
        let location = repository_location(RepositoryArgs {
            repository: Some("test-repository".to_string()),
            transformation: Some("parametrized_transformation".to_string()),
            password: Some("secret".to_string()),
            ..RepositoryArgs::default()
        })
        .unwrap();
        assert_eq!(location.directory, "/");
        assert!(location.password.is_some());
    }
}
