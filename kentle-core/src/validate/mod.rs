mod rules;
mod validator;

use crate::error::ValidationError;
use crate::types::Definition;
use validator::Validator;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for Definition {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_definition(self)
    }
}

pub fn validate_definition(def: &Definition) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.validate_definition(def);
    v.finish()
}
