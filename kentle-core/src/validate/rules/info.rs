use crate::types::Definition;
use crate::validate::validator::Validator;

pub(crate) fn validate_info(v: &mut Validator, def: &Definition) {
    if def.info.name.trim().is_empty() {
        v.push("info.name", "must not be empty");
    }

    v.unique_names(
        "info.parameters",
        "name",
        def.parameters.iter().map(|p| p.name.as_str()),
    );
    for (idx, p) in def.parameters.iter().enumerate() {
        if p.name.chars().any(char::is_whitespace) {
            v.push(
                format!("info.parameters[{idx}].name"),
                "must not contain whitespace",
            );
        }
    }

    v.unique_names(
        "connections",
        "name",
        def.connections.iter().map(|c| c.name.as_str()),
    );
}
