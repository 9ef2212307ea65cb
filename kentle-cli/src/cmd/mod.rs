pub mod doctor;
pub mod inspect;
pub mod run;
pub mod validate;

use std::path::Path;

use kentle_core::{display_chain, parse_definition_file, Definition};

use crate::exit_codes;
use crate::output::print_error;
use crate::OutputArgs;

/// Parses `path`, reporting failures the way every command does.
pub(crate) fn load_definition(path: &Path, output: &OutputArgs) -> Result<Definition, i32> {
    parse_definition_file(path).map_err(|e| {
        print_error(output.format, output.quiet, &display_chain(&e));
        exit_codes::VALIDATION_FAILED
    })
}
