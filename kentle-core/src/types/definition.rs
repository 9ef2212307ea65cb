use crate::error::GraphError;
use crate::graph::HopGraph;
use crate::types::{Connection, Hop, Parameter, Step};

/// In-memory form of a transformation loaded from a `.ktr` file.
///
/// Read-only once parsed; only the pieces needed to run, inspect and
/// validate a transformation are kept. Step-specific configuration stays in
/// the file and is interpreted by the engine.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Definition {
    pub info: TransInfo,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    pub steps: Vec<Step>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hops: Vec<Hop>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Repository directory the transformation was saved from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Names of the declared named parameters, in declaration order.
    pub fn list_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn connection(&self, name: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.name == name)
    }

    pub fn enabled_hops(&self) -> impl Iterator<Item = &Hop> {
        self.hops.iter().filter(|h| h.enabled)
    }

    pub fn hop_graph(&self) -> Result<HopGraph, GraphError> {
        HopGraph::build(self)
    }
}
