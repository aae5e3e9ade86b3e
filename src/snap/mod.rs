// src/snap/mod.rs

//! Serializable snapshots of resolved graphs for durable storage.
//!
//! A [`GraphSnapshot`] captures the job graph's own dependency structure plus
//! every definition reachable from it. Snapshots serialize to JSON and carry
//! a content-derived id (blake3 over the compact JSON form).

pub mod dep;
pub mod node;

use std::sync::Arc;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::definitions::GraphDefinition;
use crate::errors::Result;

pub use dep::{
    build_dep_structure_snapshot, DependencyStructureSnapshot, InputDependencySnap,
    NodeInvocationSnap, OutputHandleSnap,
};
pub use node::{
    build_graph_def_snap, build_node_defs_snapshot, build_op_def_snap, DefSnap, GraphDefSnap,
    InputDefSnap, InputMappingSnap, NodeDefinitionsSnapshot, OpDefSnap, OutputDefSnap,
    OutputMappingSnap,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub dep_structure_snapshot: DependencyStructureSnapshot,
    pub node_defs_snapshot: NodeDefinitionsSnapshot,
}

impl GraphSnapshot {
    pub fn from_graph(graph: &Arc<GraphDefinition>) -> Self {
        let snapshot = Self {
            name: graph.name.clone(),
            description: graph.description.clone(),
            dep_structure_snapshot: build_dep_structure_snapshot(graph),
            node_defs_snapshot: build_node_defs_snapshot(graph),
        };
        debug!(
            graph = %snapshot.name,
            ops = snapshot.node_defs_snapshot.op_def_snaps.len(),
            graphs = snapshot.node_defs_snapshot.graph_def_snaps.len(),
            "built graph snapshot"
        );
        snapshot
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Stable id: equal snapshots always hash to the same id.
    pub fn snapshot_id(&self) -> Result<String> {
        let mut hasher = Hasher::new();
        hasher.update(self.to_json()?.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}
