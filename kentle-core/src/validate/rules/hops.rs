use std::collections::HashSet;

use crate::error::GraphError;
use crate::types::Definition;
use crate::validate::validator::Validator;

pub(crate) fn validate_hops(v: &mut Validator, def: &Definition) {
    let step_names: HashSet<&str> = def.steps.iter().map(|s| s.name.as_str()).collect();
    let mut seen = HashSet::new();
    let mut dangling = false;

    for (idx, hop) in def.hops.iter().enumerate() {
        let path = format!("hops[{idx}]");
        for (field, name) in [("from", &hop.from), ("to", &hop.to)] {
            if !step_names.contains(name.as_str()) {
                v.push(format!("{path}.{field}"), format!("unknown step {name:?}"));
                dangling = true;
            }
        }
        if hop.from == hop.to {
            v.push(&path, "a step cannot hop to itself");
        }
        if !seen.insert((hop.from.as_str(), hop.to.as_str())) {
            v.push(&path, format!("duplicate hop {:?} -> {:?}", hop.from, hop.to));
        }
    }

    // Loop detection needs every hop endpoint to name exactly one step.
    if dangling || step_names.len() != def.steps.len() {
        return;
    }
    if let Err(GraphError::Loop { steps }) = def.hop_graph() {
        v.push("hops", format!("enabled hops form a loop through {}", steps.join(", ")));
    }
}
