// src/definitions/types.rs

//! Declared types of node inputs and outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type attached to an input or output port.
///
/// Only the structural properties the resolver cares about are modelled:
/// a stable key for snapshots, a display name for error messages, and
/// whether the type can receive a fan-in (multi-dependency) edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PortType {
    Any,
    Nothing,
    Named(String),
    List(Box<PortType>),
    Optional(Box<PortType>),
}

impl PortType {
    pub fn named(name: impl Into<String>) -> Self {
        PortType::Named(name.into())
    }

    pub fn list_of(inner: PortType) -> Self {
        PortType::List(Box::new(inner))
    }

    pub fn optional_of(inner: PortType) -> Self {
        PortType::Optional(Box::new(inner))
    }

    /// Fanning in produces a list, so only list-shaped types (and `Nothing`,
    /// which carries no value) accept it.
    pub fn supports_fan_in(&self) -> bool {
        matches!(self, PortType::List(_) | PortType::Nothing)
    }

    /// Stable key used in snapshots.
    pub fn key(&self) -> String {
        match self {
            PortType::Any => "Any".to_string(),
            PortType::Nothing => "Nothing".to_string(),
            PortType::Named(name) => name.clone(),
            PortType::List(inner) => format!("List.{}", inner.key()),
            PortType::Optional(inner) => format!("Optional.{}", inner.key()),
        }
    }

    /// Human readable name used in error messages.
    pub fn display_name(&self) -> String {
        match self {
            PortType::Any => "Any".to_string(),
            PortType::Nothing => "Nothing".to_string(),
            PortType::Named(name) => name.clone(),
            PortType::List(inner) => format!("[{}]", inner.display_name()),
            PortType::Optional(inner) => format!("{}?", inner.display_name()),
        }
    }
}

impl Default for PortType {
    fn default() -> Self {
        PortType::Any
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for PortType {
    type Err = String;

    /// Parses the display form: `Any`, `Nothing`, `Int`, `[Int]`, `Int?`, `[Int?]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty type name".to_string());
        }

        if let Some(inner) = s.strip_suffix('?') {
            return Ok(PortType::optional_of(inner.parse()?));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated list type: {s}"))?;
            return Ok(PortType::list_of(inner.parse()?));
        }

        match s {
            "Any" => Ok(PortType::Any),
            "Nothing" => Ok(PortType::Nothing),
            other if other.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                Ok(PortType::Named(other.to_string()))
            }
            other => Err(format!("invalid type name: {other}")),
        }
    }
}

impl From<PortType> for String {
    fn from(t: PortType) -> Self {
        t.display_name()
    }
}

impl TryFrom<String> for PortType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
