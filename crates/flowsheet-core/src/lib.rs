//! Graph model for process flowsheets.
//!
//! A flowsheet is a directed graph of stateful process components (nodes)
//! connected by named-port edges that carry numeric stream vectors. This
//! crate holds the declarative document types, the validated and indexed
//! [`FlowsheetGraph`], and the [`Stream`] payload. It has no behavior beyond
//! validation; planning and execution live in `flowsheet-sched`.

pub mod error;
pub mod graph;
pub mod id;
pub mod settings;
pub mod spec;
pub mod stream;

// Re-export commonly used types
pub use error::ConfigError;
pub use graph::{FlowsheetGraph, GraphEdge, GraphNode};
pub use id::{EdgeId, NodeId};
pub use settings::SolverSettings;
pub use spec::{EdgeSpec, FlowsheetSpec, NodeSpec};
pub use stream::{Stream, ASM1_WIDTH};
