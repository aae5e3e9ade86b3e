// src/snap/node.rs

//! Snapshots of op and graph definitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::definitions::{
    GraphDefinition, InputDefinition, InputMapping, NodeDefinition, OpDefinition,
    OutputDefinition, OutputMapping,
};
use crate::errors::DefinitionError;
use crate::snap::dep::{build_dep_structure_snapshot, DependencyStructureSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDefSnap {
    pub name: String,
    pub type_key: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDefSnap {
    pub name: String,
    pub type_key: String,
    pub description: Option<String>,
    pub is_required: bool,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMappingSnap {
    pub mapped_node_name: String,
    pub mapped_input_name: String,
    pub external_input_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMappingSnap {
    pub mapped_node_name: String,
    pub mapped_output_name: String,
    pub external_output_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpDefSnap {
    pub name: String,
    pub input_def_snaps: Vec<InputDefSnap>,
    pub output_def_snaps: Vec<OutputDefSnap>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// Sorted.
    pub required_resource_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefSnap {
    pub name: String,
    pub input_def_snaps: Vec<InputDefSnap>,
    pub output_def_snaps: Vec<OutputDefSnap>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub dep_structure_snapshot: DependencyStructureSnapshot,
    pub input_mapping_snaps: Vec<InputMappingSnap>,
    pub output_mapping_snaps: Vec<OutputMappingSnap>,
}

/// Port lookups shared by op and graph snapshots.
pub trait DefSnap {
    fn name(&self) -> &str;
    fn input_def_snaps(&self) -> &[InputDefSnap];
    fn output_def_snaps(&self) -> &[OutputDefSnap];

    fn input_snap(&self, name: &str) -> Result<&InputDefSnap, DefinitionError> {
        self.input_def_snaps()
            .iter()
            .find(|snap| snap.name == name)
            .ok_or_else(|| DefinitionError::UnknownSnapshotPort {
                definition: self.name().to_string(),
                kind: "input",
                name: name.to_string(),
            })
    }

    fn output_snap(&self, name: &str) -> Result<&OutputDefSnap, DefinitionError> {
        self.output_def_snaps()
            .iter()
            .find(|snap| snap.name == name)
            .ok_or_else(|| DefinitionError::UnknownSnapshotPort {
                definition: self.name().to_string(),
                kind: "output",
                name: name.to_string(),
            })
    }
}

impl DefSnap for OpDefSnap {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_def_snaps(&self) -> &[InputDefSnap] {
        &self.input_def_snaps
    }

    fn output_def_snaps(&self) -> &[OutputDefSnap] {
        &self.output_def_snaps
    }
}

impl DefSnap for GraphDefSnap {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_def_snaps(&self) -> &[InputDefSnap] {
        &self.input_def_snaps
    }

    fn output_def_snaps(&self) -> &[OutputDefSnap] {
        &self.output_def_snaps
    }
}

/// Every op and graph definition reachable from a graph, each list sorted by
/// definition name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDefinitionsSnapshot {
    pub op_def_snaps: Vec<OpDefSnap>,
    pub graph_def_snaps: Vec<GraphDefSnap>,
}

impl NodeDefinitionsSnapshot {
    pub fn new(mut op_def_snaps: Vec<OpDefSnap>, mut graph_def_snaps: Vec<GraphDefSnap>) -> Self {
        op_def_snaps.sort_by(|a, b| a.name.cmp(&b.name));
        graph_def_snaps.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            op_def_snaps,
            graph_def_snaps,
        }
    }

    pub fn op_def_snap(&self, name: &str) -> Option<&OpDefSnap> {
        self.op_def_snaps.iter().find(|snap| snap.name == name)
    }

    pub fn graph_def_snap(&self, name: &str) -> Option<&GraphDefSnap> {
        self.graph_def_snaps.iter().find(|snap| snap.name == name)
    }
}

pub fn build_input_def_snap(input_def: &InputDefinition) -> InputDefSnap {
    InputDefSnap {
        name: input_def.name.clone(),
        type_key: input_def.port_type.key(),
        description: input_def.description.clone(),
    }
}

pub fn build_output_def_snap(output_def: &OutputDefinition) -> OutputDefSnap {
    OutputDefSnap {
        name: output_def.name.clone(),
        type_key: output_def.port_type.key(),
        description: output_def.description.clone(),
        is_required: output_def.is_required,
        is_dynamic: output_def.is_dynamic,
    }
}

pub fn build_input_mapping_snap(mapping: &InputMapping) -> InputMappingSnap {
    InputMappingSnap {
        mapped_node_name: mapping.maps_to.node.clone(),
        mapped_input_name: mapping.maps_to.input.clone(),
        external_input_name: mapping.graph_input_name.clone(),
    }
}

pub fn build_output_mapping_snap(mapping: &OutputMapping) -> OutputMappingSnap {
    OutputMappingSnap {
        mapped_node_name: mapping.maps_from.node.clone(),
        mapped_output_name: mapping.maps_from.output.clone(),
        external_output_name: mapping.graph_output_name.clone(),
    }
}

pub fn build_op_def_snap(op: &OpDefinition) -> OpDefSnap {
    OpDefSnap {
        name: op.name.clone(),
        input_def_snaps: op.input_defs.iter().map(build_input_def_snap).collect(),
        output_def_snaps: op.output_defs.iter().map(build_output_def_snap).collect(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        required_resource_keys: op.required_resource_keys.iter().cloned().collect(),
    }
}

pub fn build_graph_def_snap(graph: &GraphDefinition) -> GraphDefSnap {
    GraphDefSnap {
        name: graph.name.clone(),
        input_def_snaps: graph.input_defs().iter().map(build_input_def_snap).collect(),
        output_def_snaps: graph.output_defs().iter().map(build_output_def_snap).collect(),
        description: graph.description.clone(),
        tags: graph.tags.clone(),
        dep_structure_snapshot: build_dep_structure_snapshot(graph),
        input_mapping_snaps: graph
            .input_mappings()
            .iter()
            .map(build_input_mapping_snap)
            .collect(),
        output_mapping_snaps: graph
            .output_mappings()
            .iter()
            .map(build_output_mapping_snap)
            .collect(),
    }
}

/// Snapshot every definition reachable from `graph`, `graph` included.
pub fn build_node_defs_snapshot(graph: &Arc<GraphDefinition>) -> NodeDefinitionsSnapshot {
    let mut op_def_snaps = Vec::new();
    let mut graph_def_snaps = Vec::new();

    for def in graph.all_node_defs() {
        match def.as_ref() {
            NodeDefinition::Op(op) => op_def_snaps.push(build_op_def_snap(op)),
            NodeDefinition::Graph(inner) => graph_def_snaps.push(build_graph_def_snap(inner)),
        }
    }

    NodeDefinitionsSnapshot::new(op_def_snaps, graph_def_snaps)
}
