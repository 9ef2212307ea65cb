#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kentle_exec::{
    BootstrapError, EngineConfig, EngineError, Environment, JobError, LogStore, PanEngine,
    RunError, RunOptions, Runner,
};

const FAKE_PAN: &str = r#"#!/bin/sh
for arg in "$@"; do
  echo "2024/05/01 10:00:00 - Pan - argument $arg"
done
echo "2024/05/01 10:00:00 - Madeira - Dispatching started for transformation [Madeira]"
if [ -n "$FAKE_SLEEP" ]; then
  sleep "$FAKE_SLEEP" &
  echo $! > "${FAKE_PID_FILE:-/dev/null}"
  wait $!
fi
if [ -n "$FAKE_EXIT" ]; then exit "$FAKE_EXIT"; fi
if [ -n "$FAKE_KILL" ]; then kill -9 $$; fi
echo "2024/05/01 10:00:01 - Generate rows.0 - Finished processing (I=0, O=0, R=0, W=10, U=0, E=0)"
if [ -n "$FAKE_ERRORS" ]; then
  echo "2024/05/01 10:00:02 - Text file output.0 - ERROR (version 9.4) : Could not write to file" >&2
  echo "2024/05/01 10:00:02 - Text file output.0 - Finished processing (I=0, O=0, R=10, W=0, U=0, E=$FAKE_ERRORS)"
  exit 1
fi
echo "2024/05/01 10:00:02 - Text file output.0 - Finished processing (I=0, O=10, R=10, W=10, U=0, E=0)"
exit 0
"#;

struct FakeKettle {
    _dir: tempfile::TempDir,
    home: PathBuf,
    script: PathBuf,
}

fn fake_kettle() -> FakeKettle {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("data-integration");
    for plugin in ["kettle-json-plugin", "kettle-xml-plugin"] {
        std::fs::create_dir_all(home.join("plugins").join(plugin)).unwrap();
    }
    let script = dir.path().join("fake-pan.sh");
    std::fs::write(&script, FAKE_PAN).unwrap();
    FakeKettle {
        _dir: dir,
        home,
        script,
    }
}

fn config(kettle: &FakeKettle, env: &[(&str, &str)]) -> EngineConfig {
    let mut config = EngineConfig::default()
        .with_home(&kettle.home)
        .with_program("sh")
        .with_program_args([kettle.script.display().to_string()]);
    for (k, v) in env {
        config.env.insert(k.to_string(), v.to_string());
    }
    config
}

fn madeira() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../etl/Madeira.ktr")
}

async fn runner(config: EngineConfig, options: RunOptions) -> Runner {
    let env = Environment::init(Arc::new(PanEngine::new(config)), Arc::new(LogStore::new()))
        .await
        .unwrap();
    Runner::new(env).with_options(options)
}

async fn report_text(runner: &Runner, job: &kentle_exec::FinishedJob) -> String {
    let mut out = Vec::new();
    runner.report(job, &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn bootstrap_counts_plugins() {
    let kettle = fake_kettle();
    let runner = runner(config(&kettle, &[]), RunOptions::default()).await;
    let info = runner.environment().engine_info();
    assert_eq!(info.engine, "pan");
    assert_eq!(info.plugin_count, 2);
    assert_eq!(info.home.as_deref(), Some(kettle.home.as_path()));
}

#[tokio::test]
async fn missing_plugins_fail_bootstrap() {
    let kettle = fake_kettle();
    std::fs::remove_dir_all(kettle.home.join("plugins")).unwrap();
    let engine = PanEngine::new(config(&kettle, &[]));
    let err = Environment::init(Arc::new(engine), Arc::new(LogStore::new()))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, BootstrapError::PluginsMissing { .. }));
}

#[tokio::test]
async fn absent_launcher_fails_bootstrap() {
    let kettle = fake_kettle();
    let config = config(&kettle, &[]).with_program(Path::new("/nonexistent/pan.sh"));
    let err = Environment::init(Arc::new(PanEngine::new(config)), Arc::new(LogStore::new()))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, BootstrapError::LauncherNotFound { .. }));
}

#[tokio::test]
async fn successful_run_captures_pan_output() {
    let kettle = fake_kettle();
    let runner = runner(config(&kettle, &[]), RunOptions::default()).await;

    let job = runner.run_from_file(madeira()).await.unwrap();
    let result = job.result();
    assert_eq!(result.nr_errors, 0);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.lines_written(), 20);

    let text = report_text(&runner, &job).await;
    assert!(text.contains(&format!("argument -file={}", madeira().display())));
    assert!(text.contains("argument -level=Minimal"));
    assert!(text.contains("Dispatching started for transformation [Madeira]"));
    assert!(!text.contains("Exception"));
    assert!(text.contains("executed successfully"));
}

#[tokio::test]
async fn step_errors_are_summed() {
    let kettle = fake_kettle();
    let runner = runner(config(&kettle, &[("FAKE_ERRORS", "4")]), RunOptions::default()).await;

    let job = runner.run_from_file(madeira()).await.unwrap();
    assert_eq!(job.result().nr_errors, 4);
    assert_eq!(job.result().exit_code, Some(1));

    let text = report_text(&runner, &job).await;
    assert!(text.contains("Could not write to file"));
    assert!(text.contains("executed with 4 errors"));
}

#[tokio::test]
async fn load_failure_exit_code_is_a_rejection() {
    let kettle = fake_kettle();
    let runner = runner(config(&kettle, &[("FAKE_EXIT", "7")]), RunOptions::default()).await;

    let err = runner.run_from_file(madeira()).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Job(JobError::Engine(EngineError::Rejected { code: 7, .. }))
    ));
}

#[tokio::test]
async fn killed_engine_is_reported_as_terminated() {
    let kettle = fake_kettle();
    let runner = runner(config(&kettle, &[("FAKE_KILL", "1")]), RunOptions::default()).await;

    let err = runner.run_from_file(madeira()).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Job(JobError::Engine(EngineError::Terminated))
    ));
}

#[tokio::test]
async fn slow_engine_times_out() {
    let kettle = fake_kettle();
    let options = RunOptions {
        timeout: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let runner = runner(config(&kettle, &[("FAKE_SLEEP", "30")]), options).await;

    let started = std::time::Instant::now();
    let err = runner.run_from_file(madeira()).await.unwrap_err();
    assert!(matches!(err, RunError::Job(JobError::TimedOut { .. })));
    assert!(started.elapsed() < Duration::from_secs(10));
}

fn is_running(pid: &str) -> bool {
    let out = std::process::Command::new("ps")
        .args(["-o", "stat=", "-p", pid])
        .output()
        .unwrap();
    let stat = String::from_utf8_lossy(&out.stdout);
    let stat = stat.trim();
    !stat.is_empty() && !stat.starts_with('Z')
}

#[tokio::test]
async fn timeout_kills_the_launchers_children() {
    let kettle = fake_kettle();
    let pid_file = kettle.home.join("sleep.pid");
    let options = RunOptions {
        timeout: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let env = [
        ("FAKE_SLEEP", "47"),
        ("FAKE_PID_FILE", pid_file.to_str().unwrap()),
    ];
    let runner = runner(config(&kettle, &env), options).await;

    let err = runner.run_from_file(madeira()).await.unwrap_err();
    assert!(matches!(err, RunError::Job(JobError::TimedOut { .. })));

    let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
    assert!(!pid.is_empty());
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while is_running(&pid) {
        assert!(
            std::time::Instant::now() < deadline,
            "sleep {pid} outlived the timed-out run"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
