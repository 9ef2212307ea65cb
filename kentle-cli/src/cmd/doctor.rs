use std::sync::Arc;

use kentle_core::display_chain;
use kentle_exec::{EngineInfo, Environment, LogStore, PanEngine};
use serde::Serialize;

use crate::config::Settings;
use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::{EngineArgs, OutputArgs};

#[derive(Serialize)]
struct Check {
    name: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Check {
    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "ok".to_string(),
            message: Some(message.into()),
        }
    }

    fn failed(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "failed".to_string(),
            message: Some(message.into()),
        }
    }

    fn warning(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "warning".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct DoctorResult {
    checks: Vec<Check>,
    all_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<EngineInfo>,
}

pub async fn doctor_cmd(engine: &EngineArgs, output: &OutputArgs) -> i32 {
    let mut checks = Vec::new();
    let mut info = None;

    match Settings::load(engine) {
        Err(e) => checks.push(Check::failed("config", display_chain(&e))),
        Ok(settings) => {
            checks.push(match &settings.source {
                Some(path) => Check::ok("config", format!("loaded {}", path.display())),
                None => Check::ok("config", "no config file, using defaults"),
            });

            // Isolated store: doctor output never mixes with a run's log.
            let pan = Arc::new(PanEngine::new(settings.engine));
            match Environment::init(pan, Arc::new(LogStore::new())).await {
                Ok(env) => {
                    let found = env.engine_info().clone();
                    checks.extend(engine_checks(&found));
                    info = Some(found);
                }
                Err(e) => checks.push(Check::failed("engine", display_chain(&e))),
            }
        }
    }

    let all_passed = checks.iter().all(|c| c.status != "failed");
    let result = DoctorResult {
        checks,
        all_passed,
        engine: info,
    };

    if output.format == OutputFormat::Text && !output.quiet {
        println!("Environment checks:");
        for c in &result.checks {
            let icon = if c.status == "ok" { "✓" } else { "✗" };
            print!("  {} {}: {}", icon, c.name, c.status);
            if let Some(msg) = &c.message {
                print!(" - {msg}");
            }
            println!();
        }
        if result.all_passed {
            println!("\nAll checks passed.");
        } else {
            println!("\nSome checks failed.");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if all_passed {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUNTIME_ERROR
    }
}

fn engine_checks(info: &EngineInfo) -> Vec<Check> {
    let launcher = info
        .launcher
        .as_ref()
        .map(|l| l.display().to_string())
        .unwrap_or_else(|| info.engine.clone());
    let mut checks = vec![Check::ok("engine", format!("{} via {launcher}", info.engine))];

    checks.push(match &info.home {
        Some(home) => Check::ok(
            "plugins",
            format!("{} plugins in {}", info.plugin_count, home.join("plugins").display()),
        ),
        None => Check::warning("plugins", "no Kettle home configured, plugins not checked"),
    });

    if let Some(version) = &info.version {
        checks.push(Check::ok("version", version.clone()));
    }
    checks
}
