// src/definitions/structure.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::definitions::dependency::{
    DependencyDefinition, InputDependencies, NodeInput, NodeOutput,
};
use crate::definitions::node::Node;

/// The resolved dependency graph of one graph definition.
///
/// Maps each bound `(node, input)` to the output(s) that satisfy it. Only
/// built from mappings that already passed validation, so every handle here
/// refers to a real node and port.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyStructure {
    node_names: BTreeSet<String>,
    input_to_outputs: BTreeMap<NodeInput, DependencyDefinition>,
    /// Reverse index: output → inputs it feeds.
    output_to_inputs: BTreeMap<NodeOutput, Vec<NodeInput>>,
}

impl DependencyStructure {
    /// Build from validated, alias-keyed dependencies.
    pub fn from_definitions(
        node_dict: &BTreeMap<String, Node>,
        dependencies: &[(String, InputDependencies)],
    ) -> Self {
        let node_names: BTreeSet<String> = node_dict.keys().cloned().collect();
        let mut input_to_outputs = BTreeMap::new();
        let mut output_to_inputs: BTreeMap<NodeOutput, Vec<NodeInput>> = BTreeMap::new();

        for (node, inputs) in dependencies {
            for (input, dep) in inputs {
                let handle = NodeInput::new(node.as_str(), input.as_str());
                for upstream in dep.node_dependencies() {
                    output_to_inputs
                        .entry(upstream.clone())
                        .or_default()
                        .push(handle.clone());
                }
                input_to_outputs.insert(handle, dep.clone());
            }
        }

        Self {
            node_names,
            input_to_outputs,
            output_to_inputs,
        }
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.node_names.iter().map(String::as_str)
    }

    pub fn has_deps(&self, input: &NodeInput) -> bool {
        self.input_to_outputs.contains_key(input)
    }

    pub fn is_fan_in(&self, input: &NodeInput) -> bool {
        self.input_to_outputs
            .get(input)
            .is_some_and(DependencyDefinition::is_fan_in)
    }

    /// The definition bound to `input`, if any.
    pub fn dependency_for(&self, input: &NodeInput) -> Option<&DependencyDefinition> {
        self.input_to_outputs.get(input)
    }

    /// Upstream outputs bound to `input` (empty if unbound).
    pub fn upstream_outputs(&self, input: &NodeInput) -> &[NodeOutput] {
        self.input_to_outputs
            .get(input)
            .map(DependencyDefinition::node_dependencies)
            .unwrap_or(&[])
    }

    /// Bound inputs of `node`, sorted by input name.
    pub fn inputs_of(&self, node: &str) -> Vec<(&NodeInput, &DependencyDefinition)> {
        self.input_to_outputs
            .iter()
            .filter(|(handle, _)| handle.node == node)
            .collect()
    }

    /// Inputs fed by `output`.
    pub fn downstream_inputs(&self, output: &NodeOutput) -> &[NodeInput] {
        self.output_to_inputs
            .get(output)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of nodes that `node` directly depends on.
    pub fn upstream_nodes(&self, node: &str) -> BTreeSet<String> {
        self.inputs_of(node)
            .into_iter()
            .flat_map(|(_, dep)| dep.node_dependencies())
            .map(|o| o.node.clone())
            .collect()
    }

    /// Names of nodes that directly depend on `node`.
    pub fn downstream_nodes(&self, node: &str) -> BTreeSet<String> {
        self.output_to_inputs
            .iter()
            .filter(|(output, _)| output.node == node)
            .flat_map(|(_, inputs)| inputs.iter().map(|i| i.node.clone()))
            .collect()
    }

    /// Number of (output → input) edges.
    pub fn edge_count(&self) -> usize {
        self.output_to_inputs.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeInput, &DependencyDefinition)> {
        self.input_to_outputs.iter()
    }

    /// Node names in dependency order (upstream first).
    ///
    /// Returns the name of a node on a cycle if the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<String>, String> {
        // Edge direction: upstream -> downstream.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in &self.node_names {
            graph.add_node(name.as_str());
        }

        for (input, dep) in &self.input_to_outputs {
            for upstream in dep.node_dependencies() {
                graph.add_edge(upstream.node.as_str(), input.node.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(cycle.node_id().to_string()),
        }
    }

    pub fn first_cycle_node(&self) -> Option<String> {
        self.topological_order().err()
    }
}
