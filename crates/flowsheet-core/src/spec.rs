//! Declarative flowsheet documents.
//!
//! A [`FlowsheetSpec`] is the format-agnostic description consumed by the
//! graph builder: a list of node records, a list of edge records and an
//! optional solver block. The JSON layout matches the documents produced by
//! the flowsheet editor (`component_type_id`, `source_handle_id`, ...).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::settings::SolverSettings;
use crate::stream::Stream;

/// One process component in the flowsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique node id.
    pub id: String,
    /// Component-type tag used to pick a factory from the registry.
    #[serde(alias = "component_type_id")]
    pub component_type: String,
    /// Display label, ignored by the scheduler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Opaque configuration handed to the component factory.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// A directed connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub id: String,
    pub source_node_id: String,
    pub source_handle_id: String,
    pub target_node_id: String,
    pub target_handle_id: String,
    /// Vector length used when the edge has no value yet. Falls back to
    /// [`SolverSettings::stream_width`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
}

/// A complete flowsheet document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowsheetSpec {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverSettings>,
}

impl FlowsheetSpec {
    /// Parses a flowsheet from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a flowsheet JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Appends a node record. Convenience for building flowsheets in code.
    pub fn node(mut self, id: &str, component_type: &str, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.nodes.push(NodeSpec {
            id: id.to_string(),
            component_type: component_type.to_string(),
            label: None,
            parameters,
        });
        self
    }

    /// Appends an edge record `source.source_port -> target.target_port`.
    pub fn edge(
        mut self,
        id: &str,
        (source, source_port): (&str, &str),
        (target, target_port): (&str, &str),
    ) -> Self {
        self.edges.push(EdgeSpec {
            id: id.to_string(),
            source_node_id: source.to_string(),
            source_handle_id: source_port.to_string(),
            target_node_id: target.to_string(),
            target_handle_id: target_port.to_string(),
            width: None,
        });
        self
    }
}

impl NodeSpec {
    /// Reads an optional numeric parameter.
    pub fn param_f64(&self, name: &str) -> Result<Option<f64>, ConfigError> {
        match self.parameters.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(name, "expected a number")),
        }
    }

    /// Reads an optional numeric array parameter as a [`Stream`].
    pub fn param_stream(&self, name: &str) -> Result<Option<Stream>, ConfigError> {
        match self.parameters.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_f64().ok_or_else(|| self.invalid(name, "expected an array of numbers")))
                .collect::<Result<Stream, _>>()
                .map(Some),
            Some(_) => Err(self.invalid(name, "expected an array of numbers")),
        }
    }

    fn invalid(&self, parameter: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidParameter {
            node: self.id.clone(),
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }
}
