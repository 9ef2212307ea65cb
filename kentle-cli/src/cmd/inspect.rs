use std::path::Path;

use kentle_core::Definition;
use serde::Serialize;

use crate::cmd::load_definition;
use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct InspectResult<'a> {
    #[serde(flatten)]
    definition: &'a Definition,
    /// Steps in execution order; absent when the hops form a loop.
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<Vec<String>>,
}

pub fn inspect_cmd(path: &Path, output: &OutputArgs) -> i32 {
    let definition = match load_definition(path, output) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let order = definition.hop_graph().ok().map(|g| g.topo_order);

    if output.format == OutputFormat::Text && !output.quiet {
        print_text(&definition, order.as_deref());
    } else {
        let result = InspectResult {
            definition: &definition,
            order,
        };
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}

fn print_text(def: &Definition, order: Option<&[String]>) {
    println!("Transformation: {}", def.name());
    if let Some(description) = &def.info.description {
        println!("  {description}");
    }

    if !def.parameters.is_empty() {
        println!("\nParameters:");
        for p in &def.parameters {
            print!("  {}", p.name);
            if let Some(default) = &p.default_value {
                print!(" = {default}");
            }
            if let Some(description) = &p.description {
                print!("  ({description})");
            }
            println!();
        }
    }

    println!("\nSteps:");
    for s in &def.steps {
        print!("  {} [{}]", s.name, s.step_type);
        if s.copies > 1 {
            print!(" x{}", s.copies);
        }
        println!();
    }

    if !def.hops.is_empty() {
        println!("\nHops:");
        for h in &def.hops {
            let disabled = if h.enabled { "" } else { " (disabled)" };
            println!("  {} -> {}{disabled}", h.from, h.to);
        }
    }

    if !def.connections.is_empty() {
        println!("\nConnections:");
        for c in &def.connections {
            let kind = c.connection_type.as_deref().unwrap_or("unknown");
            println!("  {} [{kind}]", c.name);
        }
    }

    if let Some(order) = order {
        println!("\nExecution order: {}", order.join(" -> "));
    }
}
