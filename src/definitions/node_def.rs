// src/definitions/node_def.rs

//! Node definitions: immutable templates for ops and graphs.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::definitions::container::create_execution_structure;
use crate::definitions::dependency::{DependencyMapping, NodeInput, NodeOutput, DEFAULT_OUTPUT};
use crate::definitions::node::Node;
use crate::definitions::structure::DependencyStructure;
use crate::definitions::types::PortType;
use crate::errors::DefinitionError;

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex is valid"));

pub(crate) fn check_valid_name(name: &str) -> Result<(), DefinitionError> {
    if VALID_NAME.is_match(name) {
        Ok(())
    } else {
        Err(DefinitionError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDefinition {
    pub name: String,
    pub port_type: PortType,
    pub description: Option<String>,
}

impl InputDefinition {
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDefinition {
    pub name: String,
    pub port_type: PortType,
    pub description: Option<String>,
    pub is_required: bool,
    /// Dynamic outputs fan out into a runtime-determined number of values.
    pub is_dynamic: bool,
}

impl OutputDefinition {
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
            description: None,
            is_required: true,
            is_dynamic: false,
        }
    }

    pub fn dynamic(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            is_dynamic: true,
            ..Self::new(name, port_type)
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Default for OutputDefinition {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT, PortType::Any)
    }
}

/// A leaf unit of computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDefinition {
    pub name: String,
    pub input_defs: Vec<InputDefinition>,
    pub output_defs: Vec<OutputDefinition>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub required_resource_keys: BTreeSet<String>,
}

impl OpDefinition {
    /// Construct and validate an op. With no outputs declared the op gets the
    /// single default `result` output.
    pub fn new(
        name: impl Into<String>,
        input_defs: Vec<InputDefinition>,
        output_defs: Vec<OutputDefinition>,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        check_valid_name(&name)?;

        let output_defs = if output_defs.is_empty() {
            vec![OutputDefinition::default()]
        } else {
            output_defs
        };

        check_unique_ports(&name, "input", input_defs.iter().map(|i| i.name.as_str()))?;
        check_unique_ports(&name, "output", output_defs.iter().map(|o| o.name.as_str()))?;

        Ok(Self {
            name,
            input_defs,
            output_defs,
            description: None,
            tags: BTreeMap::new(),
            required_resource_keys: BTreeSet::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_required_resource(mut self, key: impl Into<String>) -> Self {
        self.required_resource_keys.insert(key.into());
        self
    }
}

/// Re-exposes an inner node's input as an input of the enclosing graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMapping {
    pub graph_input_name: String,
    pub maps_to: NodeInput,
}

impl InputMapping {
    pub fn new(graph_input_name: impl Into<String>, node: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            graph_input_name: graph_input_name.into(),
            maps_to: NodeInput::new(node, input),
        }
    }
}

/// Re-exposes an inner node's output as an output of the enclosing graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMapping {
    pub graph_output_name: String,
    pub maps_from: NodeOutput,
}

impl OutputMapping {
    pub fn new(graph_output_name: impl Into<String>, node: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            graph_output_name: graph_output_name.into(),
            maps_from: NodeOutput::new(node, output),
        }
    }
}

/// A composite definition wrapping an internal, resolved subgraph.
#[derive(Debug, Clone)]
pub struct GraphDefinition {
    pub name: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    node_defs: Vec<Arc<NodeDefinition>>,
    dependencies: DependencyMapping,
    input_mappings: Vec<InputMapping>,
    output_mappings: Vec<OutputMapping>,
    input_defs: Vec<InputDefinition>,
    output_defs: Vec<OutputDefinition>,
    dependency_structure: DependencyStructure,
    node_dict: BTreeMap<String, Node>,
}

impl GraphDefinition {
    /// Resolve and validate a graph.
    ///
    /// Runs execution-structure construction over `node_defs` and
    /// `dependencies`, rejects dependency cycles, then checks the input and
    /// output mappings against the resolved nodes.
    pub fn new(
        name: impl Into<String>,
        node_defs: Vec<Arc<NodeDefinition>>,
        dependencies: DependencyMapping,
        input_mappings: Vec<InputMapping>,
        output_mappings: Vec<OutputMapping>,
    ) -> Result<Self, DefinitionError> {
        let name = name.into();
        check_valid_name(&name)?;

        let mut seen = HashSet::new();
        for def in &node_defs {
            if !seen.insert(def.name()) {
                return Err(DefinitionError::DuplicateDefinition {
                    graph: name.clone(),
                    name: def.name().to_string(),
                });
            }
        }

        let (dependency_structure, node_dict) =
            create_execution_structure(&node_defs, dependencies.clone(), &name)?;

        if let Some(node) = dependency_structure.first_cycle_node() {
            return Err(DefinitionError::DependencyCycle {
                graph: name,
                node,
            });
        }

        let input_defs = resolve_input_mappings(&name, &input_mappings, &node_dict)?;
        let output_defs = resolve_output_mappings(&name, &output_mappings, &node_dict)?;

        debug!(
            graph = %name,
            nodes = node_dict.len(),
            edges = dependency_structure.edge_count(),
            "resolved graph definition"
        );

        Ok(Self {
            name,
            description: None,
            tags: BTreeMap::new(),
            node_defs,
            dependencies,
            input_mappings,
            output_mappings,
            input_defs,
            output_defs,
            dependency_structure,
            node_dict,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn node_defs(&self) -> &[Arc<NodeDefinition>] {
        &self.node_defs
    }

    pub fn dependencies(&self) -> &DependencyMapping {
        &self.dependencies
    }

    pub fn dependency_structure(&self) -> &DependencyStructure {
        &self.dependency_structure
    }

    pub fn nodes(&self) -> &BTreeMap<String, Node> {
        &self.node_dict
    }

    pub fn node_named(&self, name: &str) -> Option<&Node> {
        self.node_dict.get(name)
    }

    pub fn input_mappings(&self) -> &[InputMapping] {
        &self.input_mappings
    }

    pub fn output_mappings(&self) -> &[OutputMapping] {
        &self.output_mappings
    }

    pub fn input_defs(&self) -> &[InputDefinition] {
        &self.input_defs
    }

    pub fn output_defs(&self) -> &[OutputDefinition] {
        &self.output_defs
    }

    /// Every definition reachable from this graph, depth first, each once,
    /// the graph itself included last.
    pub fn all_node_defs(self: &Arc<Self>) -> Vec<Arc<NodeDefinition>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        collect_node_defs(&self.node_defs, &mut seen, &mut out);
        if seen.insert(self.name.clone()) {
            out.push(Arc::new(NodeDefinition::Graph(Arc::clone(self))));
        }
        out
    }
}

fn collect_node_defs(
    defs: &[Arc<NodeDefinition>],
    seen: &mut HashSet<String>,
    out: &mut Vec<Arc<NodeDefinition>>,
) {
    for def in defs {
        if let NodeDefinition::Graph(graph) = def.as_ref() {
            collect_node_defs(&graph.node_defs, seen, out);
        }
        if seen.insert(def.name().to_string()) {
            out.push(Arc::clone(def));
        }
    }
}

fn resolve_input_mappings(
    graph: &str,
    mappings: &[InputMapping],
    node_dict: &BTreeMap<String, Node>,
) -> Result<Vec<InputDefinition>, DefinitionError> {
    let mut defs: Vec<InputDefinition> = Vec::new();

    for mapping in mappings {
        let target = &mapping.maps_to;
        let node = node_dict.get(&target.node).ok_or_else(|| DefinitionError::InvalidMapping {
            graph: graph.to_string(),
            kind: "input",
            reason: format!(
                "graph input \"{}\" maps to node \"{}\" which is not in the graph",
                mapping.graph_input_name, target.node
            ),
        })?;

        let inner = node.definition().input_def_named(&target.input).ok_or_else(|| {
            DefinitionError::InvalidMapping {
                graph: graph.to_string(),
                kind: "input",
                reason: format!(
                    "graph input \"{}\" maps to input \"{}\" which node \"{}\" does not have",
                    mapping.graph_input_name, target.input, target.node
                ),
            }
        })?;

        // Several inner inputs may share one graph input; the first fixes the type.
        if let Some(existing) = defs.iter().find(|d| d.name == mapping.graph_input_name) {
            if existing.port_type != inner.port_type {
                return Err(DefinitionError::InvalidMapping {
                    graph: graph.to_string(),
                    kind: "input",
                    reason: format!(
                        "graph input \"{}\" maps to inputs of conflicting types {} and {}",
                        mapping.graph_input_name, existing.port_type, inner.port_type
                    ),
                });
            }
            continue;
        }

        check_valid_name(&mapping.graph_input_name)?;
        defs.push(InputDefinition {
            name: mapping.graph_input_name.clone(),
            port_type: inner.port_type.clone(),
            description: inner.description.clone(),
        });
    }

    Ok(defs)
}

fn resolve_output_mappings(
    graph: &str,
    mappings: &[OutputMapping],
    node_dict: &BTreeMap<String, Node>,
) -> Result<Vec<OutputDefinition>, DefinitionError> {
    let mut defs: Vec<OutputDefinition> = Vec::new();

    for mapping in mappings {
        let source = &mapping.maps_from;
        let node = node_dict.get(&source.node).ok_or_else(|| DefinitionError::InvalidMapping {
            graph: graph.to_string(),
            kind: "output",
            reason: format!(
                "graph output \"{}\" maps from node \"{}\" which is not in the graph",
                mapping.graph_output_name, source.node
            ),
        })?;

        let inner = node.definition().output_def_named(&source.output).ok_or_else(|| {
            DefinitionError::InvalidMapping {
                graph: graph.to_string(),
                kind: "output",
                reason: format!(
                    "graph output \"{}\" maps from output \"{}\" which node \"{}\" does not have",
                    mapping.graph_output_name, source.output, source.node
                ),
            }
        })?;

        if defs.iter().any(|d| d.name == mapping.graph_output_name) {
            return Err(DefinitionError::InvalidMapping {
                graph: graph.to_string(),
                kind: "output",
                reason: format!(
                    "graph output \"{}\" is mapped more than once",
                    mapping.graph_output_name
                ),
            });
        }

        check_valid_name(&mapping.graph_output_name)?;
        defs.push(OutputDefinition {
            name: mapping.graph_output_name.clone(),
            ..inner.clone()
        });
    }

    Ok(defs)
}

fn check_unique_ports<'a>(
    definition: &str,
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();
    for name in names {
        check_valid_name(name)?;
        if !seen.insert(name) {
            return Err(DefinitionError::DuplicatePort {
                definition: definition.to_string(),
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Either kind of node definition.
#[derive(Debug, Clone)]
pub enum NodeDefinition {
    Op(OpDefinition),
    Graph(Arc<GraphDefinition>),
}

impl NodeDefinition {
    pub fn name(&self) -> &str {
        match self {
            NodeDefinition::Op(op) => &op.name,
            NodeDefinition::Graph(graph) => &graph.name,
        }
    }

    /// "op" or "graph", as used in error messages.
    pub fn kind_label(&self) -> &'static str {
        match self {
            NodeDefinition::Op(_) => "op",
            NodeDefinition::Graph(_) => "graph",
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            NodeDefinition::Op(op) => op.description.as_deref(),
            NodeDefinition::Graph(graph) => graph.description.as_deref(),
        }
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        match self {
            NodeDefinition::Op(op) => &op.tags,
            NodeDefinition::Graph(graph) => &graph.tags,
        }
    }

    pub fn input_defs(&self) -> &[InputDefinition] {
        match self {
            NodeDefinition::Op(op) => &op.input_defs,
            NodeDefinition::Graph(graph) => graph.input_defs(),
        }
    }

    pub fn output_defs(&self) -> &[OutputDefinition] {
        match self {
            NodeDefinition::Op(op) => &op.output_defs,
            NodeDefinition::Graph(graph) => graph.output_defs(),
        }
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.input_def_named(name).is_some()
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.output_def_named(name).is_some()
    }

    pub fn input_def_named(&self, name: &str) -> Option<&InputDefinition> {
        self.input_defs().iter().find(|i| i.name == name)
    }

    pub fn output_def_named(&self, name: &str) -> Option<&OutputDefinition> {
        self.output_defs().iter().find(|o| o.name == name)
    }

    pub fn input_names(&self) -> Vec<String> {
        self.input_defs().iter().map(|i| i.name.clone()).collect()
    }
}

impl From<OpDefinition> for NodeDefinition {
    fn from(op: OpDefinition) -> Self {
        NodeDefinition::Op(op)
    }
}

impl From<GraphDefinition> for NodeDefinition {
    fn from(graph: GraphDefinition) -> Self {
        NodeDefinition::Graph(Arc::new(graph))
    }
}
