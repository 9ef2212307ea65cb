use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kentle_core::ParseError;
use kentle_exec::{
    CollectingEventSink, EngineError, Environment, Job, JobError, JobSource, JobStatus, LogLevel,
    LogStore, MockEngine, RunError, RunOptions, Runner, StepStatus, HOME_ENV_VARS,
};

fn madeira() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../etl/Madeira.ktr")
}

async fn env_with(engine: Arc<MockEngine>) -> Environment {
    Environment::init(engine, Arc::new(LogStore::new()))
        .await
        .unwrap()
}

#[test]
fn home_variables_are_exported_in_lookup_order() {
    assert_eq!(HOME_ENV_VARS, ["KETTLE_HOME", "PDI_HOME"]);
}

fn finished(step: &str, written: u64, errors: u64) -> StepStatus {
    StepStatus {
        step: step.to_string(),
        lines_written: written,
        errors,
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_run_has_no_errors() {
    let engine = Arc::new(
        MockEngine::new()
            .with_line(LogLevel::Minimal, "Madeira - Dispatching started for transformation [Madeira]")
            .with_step(finished("Text file output", 10, 0)),
    );
    let env = env_with(engine.clone()).await;
    let runner = Runner::new(env);

    let job = runner.run_from_file(madeira()).await.unwrap();
    assert_eq!(job.result().nr_errors, 0);
    assert_eq!(job.result().status, JobStatus::Finished);
    assert_eq!(job.result().lines_written(), 10);
    assert_eq!(job.definition().unwrap().name(), "Madeira");

    let mut out = Vec::new();
    runner.report(&job, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("LOG REPORT: Transformation generated the following log lines:"));
    assert!(text.contains("Dispatching started"));
    assert!(!text.contains("Exception"));
    assert!(!text.contains("\tat "));
    let completion = format!("\nTrans {} executed successfully\n", madeira().display());
    assert!(text.starts_with(&completion));
    assert!(text.ends_with(&format!("END OF LOG REPORT\n{}\n", "*".repeat(96))));
}

#[tokio::test]
async fn bootstrap_happens_once_for_many_runs() {
    let engine = Arc::new(MockEngine::new());
    let env = env_with(engine.clone()).await;
    let runner = Runner::new(env);

    runner.run_from_file(madeira()).await.unwrap();
    runner.run_from_file(madeira()).await.unwrap();

    assert_eq!(engine.bootstrap_calls(), 1);
    assert_eq!(engine.execute_calls(), 2);
}

#[tokio::test]
async fn failed_bootstrap_yields_no_environment() {
    let engine = Arc::new(MockEngine::new().failing_bootstrap("plugins unreadable"));
    let err = Environment::init(engine.clone(), Arc::new(LogStore::new()))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("plugins unreadable"));
    assert_eq!(engine.execute_calls(), 0);
}

#[tokio::test]
async fn missing_file_is_a_parse_error_and_never_reaches_the_engine() {
    let engine = Arc::new(MockEngine::new());
    let sink = Arc::new(CollectingEventSink::new());
    let runner = Runner::new(env_with(engine.clone()).await).with_sink(sink.clone());

    let err = runner.run_from_file("etl/does-not-exist.ktr").await.unwrap_err();
    assert!(matches!(err, RunError::Parse(ParseError::Io { .. })));
    assert_eq!(engine.execute_calls(), 0);
    assert_eq!(sink.kinds(), vec!["attempting", "failed"]);
}

#[tokio::test]
async fn invalid_definition_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.ktr");
    std::fs::write(
        &path,
        "<transformation><info><name>loop</name></info><order>\
         <hop><from>a</from><to>b</to></hop><hop><from>b</from><to>a</to></hop></order>\
         <step><name>a</name><type>Dummy</type></step>\
         <step><name>b</name><type>Dummy</type></step></transformation>",
    )
    .unwrap();

    let engine = Arc::new(MockEngine::new());
    let runner = Runner::new(env_with(engine.clone()).await);
    let err = runner.run_from_file(&path).await.unwrap_err();
    assert!(matches!(err, RunError::Validation(_)));
    assert_eq!(engine.execute_calls(), 0);
}

#[tokio::test]
async fn failing_steps_are_counted_in_the_report() {
    let engine = Arc::new(
        MockEngine::new()
            .with_line(LogLevel::Error, "Text file output.0 - ERROR (version 9.4) : disk full")
            .with_step(finished("Generate rows", 10, 0))
            .with_step(finished("Text file output", 7, 3)),
    );
    let runner = Runner::new(env_with(engine).await);

    let job = runner.run_from_file(madeira()).await.unwrap();
    assert_eq!(job.result().nr_errors, 3);
    assert_eq!(job.result().status, JobStatus::FinishedWithErrors);

    let mut out = Vec::new();
    runner.report(&job, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("disk full"));
    assert!(text.contains("executed with 3 errors"));
}

#[tokio::test]
async fn declared_parameters_and_level_reach_the_engine() {
    let engine = Arc::new(MockEngine::new());
    let options = RunOptions {
        log_level: LogLevel::Detailed,
        parameters: BTreeMap::from([("ROW_LIMIT".to_string(), "25".to_string())]),
        ..Default::default()
    };
    let runner = Runner::new(env_with(engine.clone()).await).with_options(options);

    runner.run_from_file(madeira()).await.unwrap();
    let request = engine.last_request().unwrap();
    assert_eq!(request.log_level, LogLevel::Detailed);
    assert_eq!(request.parameters.get("ROW_LIMIT").map(String::as_str), Some("25"));
    assert!(!request.parameters.contains_key("OUTPUT_DIR"));
}

#[tokio::test]
async fn undeclared_parameter_is_rejected() {
    let engine = Arc::new(MockEngine::new());
    let options = RunOptions {
        parameters: BTreeMap::from([("NOPE".to_string(), "1".to_string())]),
        ..Default::default()
    };
    let runner = Runner::new(env_with(engine.clone()).await).with_options(options);

    let err = runner.run_from_file(madeira()).await.unwrap_err();
    match err {
        RunError::Job(JobError::UnknownParameter { name, transformation }) => {
            assert_eq!(name, "NOPE");
            assert_eq!(transformation, "Madeira");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.execute_calls(), 0);
}

#[tokio::test]
async fn repository_jobs_accept_any_parameter() {
    let engine = Arc::new(MockEngine::new());
    let env = env_with(engine.clone()).await;
    let mut job = Job::new(
        &env,
        JobSource::Repository(kentle_exec::RepositoryLocation {
            repository: "test-repository".to_string(),
            directory: "/home/joe".to_string(),
            transformation: "parametrized_transformation".to_string(),
            username: None,
            password: None,
        }),
    );
    assert!(job.list_parameters().is_empty());
    job.set_parameter_value("param1", "value1").unwrap();

    let finished = job.start().wait_until_finished(None).await.unwrap();
    assert!(finished.result().is_success());
    assert_eq!(
        engine.last_request().unwrap().parameters.get("param1").map(String::as_str),
        Some("value1")
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_stops_the_job() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_secs(60)));
    let options = RunOptions {
        timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    };
    let runner = Runner::new(env_with(engine).await).with_options(options);

    let err = runner.run_from_file(madeira()).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Job(JobError::TimedOut { limit }) if limit == Duration::from_secs(1)
    ));
}

#[tokio::test(start_paused = true)]
async fn stopped_job_reports_stopped() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_secs(60)));
    let env = env_with(engine).await;
    let job = Job::new(&env, JobSource::file(madeira()));

    let running = job.start();
    running.stop();
    let err = running.wait_until_finished(None).await.err().unwrap();
    assert!(matches!(err, JobError::Stopped));
}

#[tokio::test]
async fn engine_rejection_surfaces_as_job_error() {
    let engine = Arc::new(MockEngine::new().rejecting(7, "could not load"));
    let runner = Runner::new(env_with(engine).await);

    let err = runner.run_from_file(madeira()).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Job(JobError::Engine(EngineError::Rejected { code: 7, .. }))
    ));
}

#[tokio::test]
async fn general_lines_are_only_reported_on_request() {
    let engine = Arc::new(MockEngine::new().with_line(LogLevel::Minimal, "job line"));
    let env = env_with(engine).await;

    let plain = Runner::new(env.clone());
    let job = plain.run_from_file(madeira()).await.unwrap();
    let report = plain.log_report(&job).await;
    assert_eq!(report.log_text, "job line\n");

    let merged = Runner::new(env).with_options(RunOptions {
        include_general_log: true,
        ..Default::default()
    });
    let report = merged.log_report(&job).await;
    assert!(report.log_text.contains("mock engine initialised"));
    assert!(report.log_text.ends_with("job line\n"));
}

#[tokio::test]
async fn events_follow_the_run() {
    let engine = Arc::new(MockEngine::new());
    let sink = Arc::new(CollectingEventSink::new());
    let runner = Runner::new(env_with(engine).await).with_sink(sink.clone());

    runner.run_from_file(madeira()).await.unwrap();
    assert_eq!(sink.kinds(), vec!["attempting", "starting", "finished"]);
}
