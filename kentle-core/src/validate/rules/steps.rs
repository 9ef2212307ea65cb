use crate::types::Definition;
use crate::validate::validator::Validator;

pub(crate) fn validate_steps(v: &mut Validator, def: &Definition) {
    v.unique_names("steps", "name", def.steps.iter().map(|s| s.name.as_str()));

    for (idx, s) in def.steps.iter().enumerate() {
        if s.copies == 0 {
            v.push(format!("steps[{idx}].copies"), "must be at least 1");
        }
    }
}
