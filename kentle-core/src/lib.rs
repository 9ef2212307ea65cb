#![forbid(unsafe_code)]

pub mod error;
pub mod graph;
pub mod parser;
pub mod types;
pub mod validate;

pub use crate::error::{display_chain, GraphError, KentleError, ParseError, ValidationError, Violation};
pub use crate::graph::HopGraph;
pub use crate::parser::{parse_definition_file, parse_definition_str};
pub use crate::types::Definition;
pub use crate::validate::{validate_definition, Validate};
