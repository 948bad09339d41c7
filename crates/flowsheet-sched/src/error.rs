//! Error types for planning and execution.
//!
//! [`PlanningError`] marks schedules that cannot be built, [`ExecError`] marks
//! a time step that could not complete, and [`EngineError`] is the union the
//! [`Engine`](crate::engine::Engine) facade returns. A loop stage that hits
//! the sweep cap is not an error; it shows up as an unconverged
//! [`LoopOutcome`](crate::executor::LoopOutcome).

use flowsheet_core::ConfigError;
use thiserror::Error;

use crate::node::NodeError;

/// Errors produced while turning a graph into a [`Schedule`](crate::schedule::Schedule).
#[derive(Debug, Clone, Error)]
pub enum PlanningError {
    /// Kahn's algorithm could not order every strongly connected component.
    /// The condensation graph is acyclic by construction, so this is an
    /// internal invariant violation.
    #[error("internal error: condensation graph ordered {ordered} of {total} components")]
    CondensationCycle { ordered: usize, total: usize },

    /// A cyclic component still had a cycle after every tear attempt.
    #[error("cannot linearize cyclic component {{{}}} after {attempts} tear attempts", .nodes.join(", "))]
    Unlinearizable { nodes: Vec<String>, attempts: usize },

    /// A schedule failed structural validation against its graph.
    #[error("invalid schedule: {reason}")]
    InvalidSchedule { reason: String },
}

/// Errors produced while executing a time step.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A node's step function reported a failure.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: NodeError,
    },

    /// No component instance is bound to a scheduled node.
    #[error("no instance bound to node '{node}'")]
    MissingInstance { node: String },

    /// The time step is not a positive finite number.
    #[error("invalid time step: {dt}")]
    InvalidTimeStep { dt: f64 },
}

/// Errors returned by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
