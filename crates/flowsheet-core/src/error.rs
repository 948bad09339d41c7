//! Configuration error types for flowsheet-core.
//!
//! Uses `thiserror` for structured, matchable variants covering everything
//! that can be wrong with a flowsheet document before it reaches the planner.
//! Variants name the offending node or edge by its user-facing string id.

use thiserror::Error;

/// Errors produced while loading or building a flowsheet.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two node records share the same id.
    #[error("duplicate node id: '{id}'")]
    DuplicateNode { id: String },

    /// Two edge records share the same id.
    #[error("duplicate edge id: '{id}'")]
    DuplicateEdge { id: String },

    /// An edge names a node that is not declared.
    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownNode { edge: String, node: String },

    /// An edge has an empty source or target port name.
    #[error("edge '{edge}' has an empty port name")]
    EmptyPort { edge: String },

    /// Two edges feed the same input port of the same node.
    #[error("input port '{port}' of node '{node}' is fed by both '{first}' and '{second}'")]
    DuplicateInputPort {
        node: String,
        port: String,
        first: String,
        second: String,
    },

    /// No factory is registered for a node's component type.
    #[error("no factory registered for component type '{component_type}' (node '{node}')")]
    UnknownComponentType {
        node: String,
        component_type: String,
    },

    /// A node parameter is missing or has the wrong shape.
    #[error("invalid parameter '{parameter}' on node '{node}': {reason}")]
    InvalidParameter {
        node: String,
        parameter: String,
        reason: String,
    },

    /// A solver setting is outside its valid range.
    #[error("invalid solver setting '{setting}': {reason}")]
    InvalidSetting { setting: String, reason: String },

    /// The flowsheet document could not be parsed.
    #[error("malformed flowsheet document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The flowsheet document could not be read.
    #[error("failed to read flowsheet document: {0}")]
    Io(#[from] std::io::Error),
}
