// src/definitions/mapping.rs

//! Validation of dynamically-typed dependency mappings (e.g. read from a TOML
//! graph document) into a typed [`DependencyMapping`].
//!
//! Two shapes are accepted. A table keyed by node name:
//!
//! ```toml
//! [dependencies.total]
//! in_1 = { node = "sleeper_1", output = "total" }
//! ```
//!
//! or an array of entries whose `node` is a name or an invocation table:
//!
//! ```toml
//! [[dependencies]]
//! node = { name = "sleeper", alias = "sleeper_1" }
//! inputs = { units = { node = "giver", output = "out_1" } }
//! ```
//!
//! A dependency definition is `{ node, output? }`, or `{ fan_in = [...] }`
//! for fan-in.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use toml::Value;

use crate::definitions::dependency::{
    DependencyDefinition, DependencyMapping, InputDependencies, NodeInvocation, NodeKey,
    NodeOutput, RetryPolicy, DEFAULT_OUTPUT,
};
use crate::errors::DefinitionError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInvocation {
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    hooks: BTreeSet<String>,
    #[serde(default)]
    retry_policy: Option<RetryPolicy>,
}

impl From<RawInvocation> for NodeInvocation {
    fn from(raw: RawInvocation) -> Self {
        NodeInvocation {
            name: raw.name,
            alias: raw.alias,
            tags: raw.tags,
            hook_defs: raw.hooks,
            retry_policy: raw.retry_policy,
        }
    }
}

/// Validate and convert a dynamic dependency mapping.
///
/// `None` is an empty mapping.
pub fn validate_dependency_mapping(
    dependencies: Option<&Value>,
) -> Result<DependencyMapping, DefinitionError> {
    let Some(dependencies) = dependencies else {
        return Ok(DependencyMapping::new());
    };

    let mut mapping = DependencyMapping::new();

    match dependencies {
        Value::Table(table) => {
            for (key, dep_dict) in table {
                let inputs = parse_input_mapping(key, dep_dict)?;
                mapping.insert(NodeKey::Name(key.clone()), inputs);
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let (key, inputs) = parse_entry(entry)?;
                mapping.insert(key, inputs);
            }
        }
        other => {
            return Err(DefinitionError::DependenciesNotAMapping {
                value: other.to_string(),
                found: other.type_str().to_string(),
            });
        }
    }

    Ok(mapping)
}

fn parse_entry(entry: &Value) -> Result<(NodeKey, InputDependencies), DefinitionError> {
    let Some(table) = entry.as_table() else {
        return Err(DefinitionError::InvalidNodeKey {
            value: entry.to_string(),
            found: entry.type_str().to_string(),
        });
    };

    let key = match table.get("node") {
        Some(Value::String(name)) => NodeKey::Name(name.clone()),
        Some(invocation @ Value::Table(_)) => NodeKey::Invocation(parse_invocation(invocation)?),
        Some(other) => {
            return Err(DefinitionError::InvalidNodeKey {
                value: other.to_string(),
                found: other.type_str().to_string(),
            });
        }
        None => {
            return Err(DefinitionError::InvalidNodeKey {
                value: entry.to_string(),
                found: "entry without a `node` key".to_string(),
            });
        }
    };

    let key_label = key.to_string();
    let inputs = match table.get("inputs") {
        Some(value) => parse_input_mapping(&key_label, value)?,
        None => InputDependencies::new(),
    };

    Ok((key, inputs))
}

fn parse_invocation(value: &Value) -> Result<NodeInvocation, DefinitionError> {
    let raw: RawInvocation =
        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| DefinitionError::InvalidInvocation {
                key: value.to_string(),
                reason: e.message().to_string(),
            })?;
    Ok(raw.into())
}

/// A table that is itself a dependency definition rather than a mapping of
/// input name to dependency definition.
fn looks_like_dependency(value: &Value) -> bool {
    let Some(table) = value.as_table() else {
        return false;
    };
    matches!(table.get("node"), Some(Value::String(_)))
        || matches!(table.get("fan_in"), Some(Value::Array(_)))
}

fn parse_input_mapping(key: &str, dep_dict: &Value) -> Result<InputDependencies, DefinitionError> {
    if looks_like_dependency(dep_dict) {
        return Err(DefinitionError::DependencyOneLayerTooHigh {
            key: key.to_string(),
        });
    }

    let Some(table) = dep_dict.as_table() else {
        return Err(DefinitionError::InputMappingNotAMapping {
            key: key.to_string(),
            value: dep_dict.to_string(),
            found: dep_dict.type_str().to_string(),
        });
    };

    let mut inputs = InputDependencies::new();
    for (input, dep) in table {
        let parsed = parse_dependency(dep).ok_or_else(|| DefinitionError::InvalidDependency {
            node: key.to_string(),
            input: input.clone(),
            value: dep.to_string(),
            found: dep.type_str().to_string(),
        })?;
        inputs.insert(input.clone(), parsed);
    }

    Ok(inputs)
}

fn parse_dependency(value: &Value) -> Option<DependencyDefinition> {
    let table = value.as_table()?;

    if let Some(sources) = table.get("fan_in") {
        if table.len() != 1 {
            return None;
        }
        let outputs = sources
            .as_array()?
            .iter()
            .map(parse_output_ref)
            .collect::<Option<Vec<_>>>()?;
        return Some(DependencyDefinition::Multi(outputs));
    }

    parse_output_ref(value).map(DependencyDefinition::Single)
}

fn parse_output_ref(value: &Value) -> Option<NodeOutput> {
    let table = value.as_table()?;
    if table.keys().any(|k| k != "node" && k != "output") {
        return None;
    }
    let node = table.get("node")?.as_str()?;
    let output = match table.get("output") {
        Some(v) => v.as_str()?,
        None => DEFAULT_OUTPUT,
    };
    Some(NodeOutput::new(node, output))
}
