use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KentleError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML at byte {position}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("document is empty")]
    Empty,
    #[error("root element must be <transformation>, found <{found}>")]
    NotATransformation { found: String },
    #[error("<{element}> at {path} is missing its <{missing}> element")]
    MissingElement {
        element: &'static str,
        missing: &'static str,
        path: String,
    },
    #[error("invalid value {value:?} for {path}: {reason}")]
    InvalidValue {
        path: String,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Error)]
#[error("transformation failed validation ({violations_len} violations)")]
pub struct ValidationError {
    pub violations: Vec<Violation>,
    violations_len: usize,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        let violations_len = violations.len();
        Self {
            violations,
            violations_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("hops form a loop through steps: {}", steps.join(", "))]
    Loop { steps: Vec<String> },
    #[error("hop references unknown step {0:?}")]
    UnknownStep(String),
}

/// Renders an error followed by its `source()` chain, separated by `": "`.
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut next = err.source();
    while let Some(e) = next {
        out.push_str(": ");
        out.push_str(&e.to_string());
        next = e.source();
    }
    out
}
