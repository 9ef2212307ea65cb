use std::collections::HashSet;

use crate::error::{ValidationError, Violation};
use crate::types::Definition;

use super::rules;

pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_definition(&mut self, def: &Definition) {
        rules::info::validate_info(self, def);
        rules::steps::validate_steps(self, def);
        rules::hops::validate_hops(self, def);
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    /// Flags every name that was already seen under `path`.
    pub(crate) fn unique_names<'a>(
        &mut self,
        path: &str,
        field: &str,
        names: impl Iterator<Item = &'a str>,
    ) {
        let mut seen = HashSet::new();
        for (idx, name) in names.enumerate() {
            if !seen.insert(name) {
                self.push(format!("{path}[{idx}].{field}"), format!("{name:?} must be unique"));
            }
        }
    }
}
