// src/errors.rs

//! Crate-wide error types.
//!
//! - [`DefinitionError`] covers user mistakes in node/graph definitions and
//!   dependency mappings. These surface at graph-build time.
//! - [`MonitorError`] covers broken invariants seen while monitoring runs.
//! - [`OpgraphError`] is the top-level error for config loading and the CLI.

use thiserror::Error;

const DEPENDENCY_MAPPING_PRELUDE: &str = "The expected type for \"dependencies\" is a mapping of \
     node name or node invocation to a mapping of input name to dependency definition.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("{prelude} Received value {value} of type {found} at the top level.", prelude = DEPENDENCY_MAPPING_PRELUDE)]
    DependenciesNotAMapping { value: String, found: String },

    #[error(
        "{prelude} Expected str or NodeInvocation key in the top level mapping. \
         Received value {value} of type {found}", prelude = DEPENDENCY_MAPPING_PRELUDE)]
    InvalidNodeKey { value: String, found: String },

    #[error(
        "{prelude} Received a dependency definition one layer too high under key \
         {key}. The dependency definition should be moved in to a mapping keyed on input name.", prelude = DEPENDENCY_MAPPING_PRELUDE)]
    DependencyOneLayerTooHigh { key: String },

    #[error(
        "{prelude} Under key {key} received value {value} of type {found}. \
         Expected mapping of input name to dependency definition", prelude = DEPENDENCY_MAPPING_PRELUDE)]
    InputMappingNotAMapping {
        key: String,
        value: String,
        found: String,
    },

    #[error(
        "{prelude} Expected dependency definition for node \"{node}\" input \
         \"{input}\". Received value {value} of type {found}.", prelude = DEPENDENCY_MAPPING_PRELUDE)]
    InvalidDependency {
        node: String,
        input: String,
        value: String,
        found: String,
    },

    #[error("Invalid node invocation under key {key}: {reason}")]
    InvalidInvocation { key: String, reason: String },

    #[error(
        "Invalid dependencies: node alias \"{alias}\" is used more than once in the dependency mapping"
    )]
    DuplicateAlias { alias: String },

    #[error(
        "Invalid dependencies: node alias \"{alias}\" (aliasing \"{definition}\") collides with \
         node \"{alias}\" of definition \"{other}\""
    )]
    AliasCollision {
        alias: String,
        definition: String,
        other: String,
    },

    #[error(
        "Invalid dependencies: circular reference detected in node \"{node}\" input \"{input}\""
    )]
    CircularReference { node: String, input: String },

    #[error("Invalid dependencies: node \"{node}\" in dependency dictionary not found in node list")]
    UnknownNode { node: String },

    #[error(
        "Invalid dependencies: node \"{definition}\" (aliased by \"{alias}\" in dependency \
         dictionary) not found in node list"
    )]
    UnknownAliasedNode { definition: String, alias: String },

    #[error(
        "Invalid dependencies: {kind} \"{node}\" does not have input \"{input}\". Available inputs: {available:?}"
    )]
    MissingInput {
        kind: &'static str,
        node: String,
        input: String,
        available: Vec<String>,
    },

    #[error(
        "Invalid dependencies: node \"{node}\" not found in node list. Listed as dependency for node \
         \"{from_node}\" input \"{from_input}\""
    )]
    UnknownDependencyNode {
        node: String,
        from_node: String,
        from_input: String,
    },

    #[error(
        "Invalid dependencies: node \"{node}\" does not have output \"{output}\". Listed as \
         dependency for node \"{from_node}\" input \"{from_input}\""
    )]
    MissingOutput {
        node: String,
        output: String,
        from_node: String,
        from_input: String,
    },

    #[error(
        "Invalid dependencies: for node \"{node}\" input \"{input}\", the type \"{type_name}\" does \
         not support fanning in (multi-dependency definition). Use the List type, since fanning in \
         will result in a list."
    )]
    FanInNotSupported {
        node: String,
        input: String,
        type_name: String,
    },

    #[error("Circular dependencies exist in graph \"{graph}\" involving node \"{node}\"")]
    DependencyCycle { graph: String, node: String },

    #[error("\"{name}\" is not a valid name. Names must be in regex ^[A-Za-z0-9_]+$.")]
    InvalidName { name: String },

    #[error("Definition \"{definition}\" declares {kind} \"{name}\" more than once")]
    DuplicatePort {
        definition: String,
        kind: &'static str,
        name: String,
    },

    #[error("Graph \"{graph}\" contains more than one definition named \"{name}\"")]
    DuplicateDefinition { graph: String, name: String },

    #[error("Invalid {kind} mapping in graph \"{graph}\": {reason}")]
    InvalidMapping {
        graph: String,
        kind: &'static str,
        reason: String,
    },

    #[error("Snapshot of \"{definition}\" has no {kind} named \"{name}\"")]
    UnknownSnapshotPort {
        definition: String,
        kind: &'static str,
        name: String,
    },

    #[error("Graph document error: {0}")]
    Document(String),
}

/// Invariant failures hit while monitoring a single run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Run {run_id} in status STARTING doesn't have a launch time.")]
    MissingLaunchTime { run_id: String },

    #[error("Run {run_id} not found in run storage")]
    RunNotFound { run_id: String },

    #[error("Unexpected run status: {status}")]
    UnexpectedRunStatus { status: String },

    #[error("Invalid value for tag {tag} on run {run_id}: {value:?}")]
    InvalidTag {
        tag: String,
        run_id: String,
        value: String,
    },
}

impl MonitorError {
    /// Stable class name recorded in serialized error info.
    pub fn class_name(&self) -> &'static str {
        match self {
            MonitorError::MissingLaunchTime { .. } => "MissingLaunchTime",
            MonitorError::RunNotFound { .. } => "RunNotFound",
            MonitorError::UnexpectedRunStatus { .. } => "UnexpectedRunStatus",
            MonitorError::InvalidTag { .. } => "InvalidTag",
        }
    }
}

#[derive(Error, Debug)]
pub enum OpgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OpgraphError>;
