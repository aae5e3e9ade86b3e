// src/snap/dep.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definitions::GraphDefinition;

/// One upstream output feeding an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputHandleSnap {
    pub node_name: String,
    pub output_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDependencySnap {
    pub input_name: String,
    pub upstream_output_snaps: Vec<OutputHandleSnap>,
    /// Bound through a fan-in (multi) dependency.
    pub is_fan_in: bool,
}

/// One placed node and the dependencies of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInvocationSnap {
    pub node_name: String,
    pub node_def_name: String,
    pub tags: BTreeMap<String, String>,
    pub input_dep_snaps: Vec<InputDependencySnap>,
}

impl NodeInvocationSnap {
    pub fn input_dep_snap(&self, input_name: &str) -> Option<&InputDependencySnap> {
        self.input_dep_snaps
            .iter()
            .find(|snap| snap.input_name == input_name)
    }
}

/// Serializable form of a graph's `DependencyStructure`, nodes sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStructureSnapshot {
    pub node_invocation_snaps: Vec<NodeInvocationSnap>,
}

impl DependencyStructureSnapshot {
    pub fn node_invocation_snap(&self, node_name: &str) -> Option<&NodeInvocationSnap> {
        self.node_invocation_snaps
            .iter()
            .find(|snap| snap.node_name == node_name)
    }
}

pub fn build_dep_structure_snapshot(graph: &GraphDefinition) -> DependencyStructureSnapshot {
    let structure = graph.dependency_structure();

    // `nodes()` is a BTreeMap, so invocations come out sorted by node name.
    let node_invocation_snaps = graph
        .nodes()
        .values()
        .map(|node| {
            let input_dep_snaps = structure
                .inputs_of(node.name())
                .into_iter()
                .map(|(handle, dep)| InputDependencySnap {
                    input_name: handle.input.clone(),
                    upstream_output_snaps: dep
                        .node_dependencies()
                        .iter()
                        .map(|output| OutputHandleSnap {
                            node_name: output.node.clone(),
                            output_name: output.output.clone(),
                        })
                        .collect(),
                    is_fan_in: dep.is_fan_in(),
                })
                .collect();

            NodeInvocationSnap {
                node_name: node.name().to_string(),
                node_def_name: node.definition().name().to_string(),
                tags: node.tags().clone(),
                input_dep_snaps,
            }
        })
        .collect();

    DependencyStructureSnapshot {
        node_invocation_snaps,
    }
}
