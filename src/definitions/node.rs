// src/definitions/node.rs

//! Materialized node instances inside a graph.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::definitions::dependency::{NodeInput, NodeOutput, RetryPolicy};
use crate::definitions::node_def::{GraphDefinition, NodeDefinition, OpDefinition};
use crate::definitions::structure::DependencyStructure;

/// State shared by every node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHeader {
    /// Alias of the invocation, or the definition name when unaliased.
    pub name: String,
    /// Name of the graph this node lives in.
    pub graph_name: String,
    pub tags: BTreeMap<String, String>,
    pub hook_defs: BTreeSet<String>,
    pub retry_policy: Option<RetryPolicy>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Leaf node backed by an op.
    Op,
    /// Composite node wrapping a resolved subgraph.
    Graph(Arc<GraphDefinition>),
}

#[derive(Debug, Clone)]
pub struct Node {
    header: NodeHeader,
    definition: Arc<NodeDefinition>,
    kind: NodeKind,
}

impl Node {
    pub(crate) fn new(header: NodeHeader, definition: Arc<NodeDefinition>) -> Self {
        let kind = match definition.as_ref() {
            NodeDefinition::Op(_) => NodeKind::Op,
            NodeDefinition::Graph(graph) => NodeKind::Graph(Arc::clone(graph)),
        };
        Self {
            header,
            definition,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn header(&self) -> &NodeHeader {
        &self.header
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    pub fn definition_arc(&self) -> &Arc<NodeDefinition> {
        &self.definition
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.header.tags
    }

    pub fn hook_defs(&self) -> &BTreeSet<String> {
        &self.header.hook_defs
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.header.retry_policy.as_ref()
    }

    pub fn is_graph(&self) -> bool {
        matches!(self.kind, NodeKind::Graph(_))
    }

    pub fn as_op(&self) -> Option<&OpDefinition> {
        match self.definition.as_ref() {
            NodeDefinition::Op(op) => Some(op),
            NodeDefinition::Graph(_) => None,
        }
    }

    /// The inner dependency structure of a composite node.
    pub fn sub_dependency_structure(&self) -> Option<&DependencyStructure> {
        match &self.kind {
            NodeKind::Graph(graph) => Some(graph.dependency_structure()),
            NodeKind::Op => None,
        }
    }

    /// Handles for every input of this node.
    pub fn input_handles(&self) -> Vec<NodeInput> {
        self.definition
            .input_defs()
            .iter()
            .map(|i| NodeInput::new(self.name(), &i.name))
            .collect()
    }

    /// Handles for every output of this node.
    pub fn output_handles(&self) -> Vec<NodeOutput> {
        self.definition
            .output_defs()
            .iter()
            .map(|o| NodeOutput::new(self.name(), &o.name))
            .collect()
    }
}

/// Nodes compare by header and by the shape of their definition.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.definition.name() == other.definition.name()
            && self.definition.kind_label() == other.definition.kind_label()
            && self.definition.input_defs() == other.definition.input_defs()
            && self.definition.output_defs() == other.definition.output_defs()
    }
}
