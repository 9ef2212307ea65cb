use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::GraphError;
use crate::types::Definition;

/// Step graph formed by the enabled hops of a transformation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HopGraph {
    /// step -> steps it reads rows from
    pub inputs: BTreeMap<String, Vec<String>>,
    /// steps with no enabled incoming hop
    pub sources: Vec<String>,
    pub topo_order: Vec<String>,
}

impl HopGraph {
    pub fn build(def: &Definition) -> Result<Self, GraphError> {
        let mut inputs: BTreeMap<String, Vec<String>> = def
            .steps
            .iter()
            .map(|s| (s.name.clone(), Vec::new()))
            .collect();

        for hop in def.enabled_hops() {
            if !inputs.contains_key(&hop.from) {
                return Err(GraphError::UnknownStep(hop.from.clone()));
            }
            match inputs.get_mut(&hop.to) {
                Some(v) => v.push(hop.from.clone()),
                None => return Err(GraphError::UnknownStep(hop.to.clone())),
            }
        }
        for v in inputs.values_mut() {
            v.sort();
            v.dedup();
        }

        let topo_order = topo_sort(&def.step_names(), &inputs)?;
        let sources = topo_order
            .iter()
            .filter(|s| inputs.get(*s).map_or(true, |v| v.is_empty()))
            .cloned()
            .collect();

        Ok(Self {
            inputs,
            sources,
            topo_order,
        })
    }
}

impl Definition {
    /// Step names in declaration order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }
}

fn topo_sort(
    nodes: &[String],
    inputs: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<String>, GraphError> {
    let mut indeg: BTreeMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut outgoing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (to, froms) in inputs {
        for from in froms {
            if let Some(d) = indeg.get_mut(to.as_str()) {
                *d += 1;
            }
            outgoing.entry(from.as_str()).or_default().push(to.as_str());
        }
    }

    // Seed in declaration order so unrelated branches keep the file's order.
    let mut q: VecDeque<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|n| indeg.get(n).copied() == Some(0))
        .collect();

    let mut out = Vec::with_capacity(nodes.len());
    while let Some(n) = q.pop_front() {
        out.push(n.to_string());
        if let Some(nexts) = outgoing.get(n) {
            for m in nexts {
                if let Some(e) = indeg.get_mut(m) {
                    *e -= 1;
                    if *e == 0 {
                        q.push_back(*m);
                    }
                }
            }
        }
    }

    if out.len() != nodes.len() {
        let emitted: BTreeSet<&str> = out.iter().map(String::as_str).collect();
        let steps = nodes
            .iter()
            .filter(|n| !emitted.contains(n.as_str()))
            .cloned()
            .collect();
        return Err(GraphError::Loop { steps });
    }
    Ok(out)
}
