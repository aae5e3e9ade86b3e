// src/definitions/mod.rs

//! Node and graph definitions and the resolver that turns a dependency
//! mapping into a validated execution structure.
//!
//! Layout:
//! - `types`: declared port types.
//! - `dependency`: invocations, dependency definitions, the typed mapping.
//! - `mapping`: validation of dynamic (TOML) dependency mappings.
//! - `node_def`: op and graph definitions.
//! - `node`: materialized nodes.
//! - `container`: `create_execution_structure`.
//! - `structure`: the resolved `DependencyStructure`.
//! - `document`: TOML graph documents.

pub mod container;
pub mod dependency;
pub mod document;
pub mod mapping;
pub mod node;
pub mod node_def;
pub mod structure;
pub mod types;

pub use container::{create_execution_structure, NodeMap};
pub use dependency::{
    DependencyDefinition, DependencyMapping, InputDependencies, NodeInput, NodeInvocation,
    NodeKey, NodeOutput, RetryPolicy, DEFAULT_OUTPUT,
};
pub use document::GraphDocument;
pub use mapping::validate_dependency_mapping;
pub use node::{Node, NodeHeader, NodeKind};
pub use node_def::{
    GraphDefinition, InputDefinition, InputMapping, NodeDefinition, OpDefinition,
    OutputDefinition, OutputMapping,
};
pub use structure::DependencyStructure;
pub use types::PortType;
