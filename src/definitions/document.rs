// src/definitions/document.rs

//! Declarative graph documents.
//!
//! A document declares ops, graphs and the job graph to resolve:
//!
//! ```toml
//! job = "sleepy"
//!
//! [op.giver]
//! outputs = { out_1 = "Int", out_2 = "Int" }
//!
//! [op.sleeper]
//! inputs = { units = "Int" }
//! outputs = { total = "Int" }
//!
//! [op.total]
//! inputs = { in_1 = "Int", in_2 = "Int" }
//!
//! [graph.sleepy]
//! nodes = ["giver", "sleeper", "total"]
//!
//! [[graph.sleepy.dependencies]]
//! node = { name = "sleeper", alias = "sleeper_1" }
//! inputs = { units = { node = "giver", output = "out_1" } }
//! ```
//!
//! Graphs may use ops and other graphs of the same document. Ports are either
//! a type string or a table `{ type, description, dynamic, required }`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::definitions::dependency::{DependencyMapping, NodeKey, DEFAULT_OUTPUT};
use crate::definitions::mapping::validate_dependency_mapping;
use crate::definitions::node_def::{
    GraphDefinition, InputDefinition, InputMapping, NodeDefinition, OpDefinition,
    OutputDefinition, OutputMapping,
};
use crate::definitions::types::PortType;
use crate::errors::{DefinitionError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    job: String,
    #[serde(default)]
    op: IndexMap<String, RawOp>,
    #[serde(default)]
    graph: IndexMap<String, RawGraph>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOp {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    inputs: IndexMap<String, RawPort>,
    #[serde(default)]
    outputs: IndexMap<String, RawPort>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    required_resource_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Type(PortType),
    Detailed(RawPortDetail),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPortDetail {
    #[serde(rename = "type", default)]
    port_type: PortType,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dynamic: bool,
    #[serde(default = "default_required")]
    required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGraph {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    /// Definitions used by the graph. Defaults to every definition named by
    /// the dependency mapping.
    #[serde(default)]
    nodes: Option<Vec<String>>,
    #[serde(default)]
    dependencies: Option<toml::Value>,
    #[serde(default)]
    input_mappings: Vec<RawInputMapping>,
    #[serde(default)]
    output_mappings: Vec<RawOutputMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInputMapping {
    graph_input: String,
    node: String,
    input: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutputMapping {
    graph_output: String,
    node: String,
    #[serde(default = "default_output")]
    output: String,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

/// A loaded and fully resolved graph document.
#[derive(Debug, Clone)]
pub struct GraphDocument {
    job: Arc<GraphDefinition>,
    ops: BTreeMap<String, Arc<NodeDefinition>>,
    graphs: BTreeMap<String, Arc<GraphDefinition>>,
}

impl GraphDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let document = Self::parse(&contents)?;
        info!(path = %path.display(), job = %document.job.name, "loaded graph document");
        Ok(document)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawDocument = toml::from_str(contents)?;
        Ok(Self::try_from(raw)?)
    }

    /// The job graph named by the document's `job` key.
    pub fn job(&self) -> &Arc<GraphDefinition> {
        &self.job
    }

    pub fn graph(&self, name: &str) -> Option<&Arc<GraphDefinition>> {
        self.graphs.get(name)
    }

    pub fn op(&self, name: &str) -> Option<&Arc<NodeDefinition>> {
        self.ops.get(name)
    }

    pub fn graph_names(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }
}

impl TryFrom<RawDocument> for GraphDocument {
    type Error = DefinitionError;

    fn try_from(raw: RawDocument) -> std::result::Result<Self, Self::Error> {
        let mut ops = BTreeMap::new();
        for (name, op) in raw.op {
            if raw.graph.contains_key(&name) {
                return Err(DefinitionError::Document(format!(
                    "\"{name}\" is declared both as an op and as a graph"
                )));
            }
            let def = build_op(&name, op)?;
            ops.insert(name, Arc::new(NodeDefinition::Op(def)));
        }

        let mut builder = GraphBuilder {
            raw_graphs: raw.graph,
            ops: &ops,
            built: BTreeMap::new(),
            visiting: Vec::new(),
        };

        let names: Vec<String> = builder.raw_graphs.keys().cloned().collect();
        for name in &names {
            builder.build(name)?;
        }

        let graphs = builder.built;
        let job = graphs.get(&raw.job).cloned().ok_or_else(|| {
            DefinitionError::Document(format!("job \"{}\" is not a declared graph", raw.job))
        })?;

        Ok(Self { job, ops, graphs })
    }
}

fn build_op(name: &str, raw: RawOp) -> std::result::Result<OpDefinition, DefinitionError> {
    let inputs = raw
        .inputs
        .into_iter()
        .map(|(port, decl)| match decl {
            RawPort::Type(port_type) => InputDefinition::new(port, port_type),
            RawPort::Detailed(detail) => InputDefinition {
                name: port,
                port_type: detail.port_type,
                description: detail.description,
            },
        })
        .collect();

    let outputs = raw
        .outputs
        .into_iter()
        .map(|(port, decl)| match decl {
            RawPort::Type(port_type) => OutputDefinition::new(port, port_type),
            RawPort::Detailed(detail) => OutputDefinition {
                name: port,
                port_type: detail.port_type,
                description: detail.description,
                is_required: detail.required,
                is_dynamic: detail.dynamic,
            },
        })
        .collect();

    let mut op = OpDefinition::new(name, inputs, outputs)?;
    op.description = raw.description;
    op.tags = raw.tags;
    op.required_resource_keys = raw.required_resource_keys.into_iter().collect();
    Ok(op)
}

struct GraphBuilder<'a> {
    raw_graphs: IndexMap<String, RawGraph>,
    ops: &'a BTreeMap<String, Arc<NodeDefinition>>,
    built: BTreeMap<String, Arc<GraphDefinition>>,
    /// Graphs currently being built, to reject graphs that contain themselves.
    visiting: Vec<String>,
}

impl GraphBuilder<'_> {
    fn build(&mut self, name: &str) -> std::result::Result<Arc<GraphDefinition>, DefinitionError> {
        if let Some(graph) = self.built.get(name) {
            return Ok(Arc::clone(graph));
        }
        if self.visiting.iter().any(|v| v == name) {
            return Err(DefinitionError::Document(format!(
                "graph \"{name}\" contains itself (via {})",
                self.visiting.join(" -> ")
            )));
        }

        let Some(raw) = self.raw_graphs.get(name) else {
            return Err(DefinitionError::Document(format!(
                "graph \"{name}\" is not declared"
            )));
        };

        let dependencies = validate_dependency_mapping(raw.dependencies.as_ref())?;
        let node_names = match &raw.nodes {
            Some(nodes) => nodes.clone(),
            None => definitions_named_by(&dependencies),
        };
        let description = raw.description.clone();
        let tags = raw.tags.clone();
        let input_mappings: Vec<InputMapping> = raw
            .input_mappings
            .iter()
            .map(|m| InputMapping::new(&m.graph_input, &m.node, &m.input))
            .collect();
        let output_mappings: Vec<OutputMapping> = raw
            .output_mappings
            .iter()
            .map(|m| OutputMapping::new(&m.graph_output, &m.node, &m.output))
            .collect();

        self.visiting.push(name.to_string());
        let mut node_defs = Vec::with_capacity(node_names.len());
        for node_name in &node_names {
            node_defs.push(self.resolve(name, node_name)?);
        }
        self.visiting.pop();

        let mut graph =
            GraphDefinition::new(name, node_defs, dependencies, input_mappings, output_mappings)?;
        graph.description = description;
        graph.tags = tags;

        debug!(graph = %name, "built graph from document");

        let graph = Arc::new(graph);
        self.built.insert(name.to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    fn resolve(
        &mut self,
        graph: &str,
        node_name: &str,
    ) -> std::result::Result<Arc<NodeDefinition>, DefinitionError> {
        if let Some(op) = self.ops.get(node_name) {
            return Ok(Arc::clone(op));
        }
        if self.raw_graphs.contains_key(node_name) {
            let inner = self.build(node_name)?;
            return Ok(Arc::new(NodeDefinition::Graph(inner)));
        }
        Err(DefinitionError::Document(format!(
            "graph \"{graph}\" uses \"{node_name}\", which is neither an op nor a graph"
        )))
    }
}

/// Definition names used as keys of a mapping, first use first.
fn definitions_named_by(dependencies: &DependencyMapping) -> Vec<String> {
    let mut seen = BTreeSet::new();
    dependencies
        .iter()
        .map(|(key, _)| match key {
            NodeKey::Name(name) => name.clone(),
            NodeKey::Invocation(invocation) => invocation.name.clone(),
        })
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
