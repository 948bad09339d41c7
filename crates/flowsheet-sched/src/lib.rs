//! Execution scheduling for process flowsheets.
//!
//! Turns a [`FlowsheetGraph`](flowsheet_core::FlowsheetGraph) into an ordered
//! execution plan and drives stateful components through it one time step at
//! a time. Feed-forward regions run each node once per step; recycle loops
//! are torn open and solved by damped fixed-point iteration.
//!
//! # Modules
//!
//! - [`scc`] -- Tarjan decomposition into strongly connected components
//! - [`plan`] -- Condensation ordering, tear selection, stage emission
//! - [`schedule`] -- The immutable plan, its lookups and self-validation
//! - [`node`] -- The `step(dt, inputs) -> outputs` component contract
//! - [`buffer`] -- Last value produced on every edge
//! - [`executor`] -- Stage dispatch and loop relaxation
//! - [`adapters`] -- Built-in components
//! - [`registry`] -- Component-type -> factory map
//! - [`engine`] -- Build/plan/run facade
//! - [`fuzz`] -- Seeded random-graph planner checks
//! - [`error`] -- Planning, execution and engine errors

pub mod adapters;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod executor;
pub mod fuzz;
pub mod node;
pub mod plan;
pub mod registry;
pub mod scc;
pub mod schedule;

pub use engine::Engine;
pub use error::{EngineError, ExecError, PlanningError};
pub use executor::{Executor, LoopOutcome, StepReport};
pub use node::{NodeError, Ports, ProcessNode};
pub use plan::{plan, plan_graph};
pub use registry::NodeRegistry;
pub use scc::{decompose, decompose_graph, SccDecomposition, SccId};
pub use schedule::{Schedule, ScheduleReport, Stage, StageReport};
