use std::path::Path;

use kentle_core::Validate;
use serde::Serialize;

use crate::cmd::load_definition;
use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    transformation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub fn validate_cmd(path: &Path, output: &OutputArgs) -> i32 {
    let definition = match load_definition(path, output) {
        Ok(d) => d,
        Err(code) => return code,
    };

    match definition.validate() {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: valid transformation {} ({} steps, {} hops)",
                    definition.name(),
                    definition.steps.len(),
                    definition.hops.len()
                );
            } else {
                let result = ValidateResult {
                    valid: true,
                    transformation: definition.name().to_string(),
                    errors: vec![],
                };
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            let errors: Vec<String> = err.violations.iter().map(ToString::to_string).collect();
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: validation failed");
                for e in &errors {
                    eprintln!("- {e}");
                }
            } else {
                let result = ValidateResult {
                    valid: false,
                    transformation: definition.name().to_string(),
                    errors,
                };
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
