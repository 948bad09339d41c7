//! Runtime executor: drives one time step over a schedule.
//!
//! Acyclic stages run their node once. Loop stages sweep their internal
//! order repeatedly, blending each tear edge's fresh value with its value
//! from the previous sweep, until the largest change drops below the
//! tolerance or the sweep cap is reached. Hitting the cap is reported in the
//! [`LoopOutcome`] and logged as a warning; the step carries on with the last
//! relaxed values.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use flowsheet_core::{EdgeId, FlowsheetGraph, NodeId, SolverSettings, Stream};

use crate::buffer::EdgeBuffer;
use crate::error::ExecError;
use crate::node::{Ports, ProcessNode};
use crate::scc::SccId;
use crate::schedule::{Schedule, Stage};

/// Result of one loop stage within a time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopOutcome {
    pub component: SccId,
    /// Sweeps performed, between 1 and `max_iter`.
    pub sweeps: usize,
    /// Largest tear-edge change in the final sweep.
    pub residual: f64,
    pub converged: bool,
}

/// Result of one time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// One entry per loop stage, in schedule order.
    pub loops: Vec<LoopOutcome>,
}

impl StepReport {
    /// `true` if every loop stage met the tolerance.
    pub fn converged(&self) -> bool {
        self.loops.iter().all(|l| l.converged)
    }

    /// Total sweeps across all loop stages.
    pub fn total_sweeps(&self) -> usize {
        self.loops.iter().map(|l| l.sweeps).sum()
    }
}

/// Owns the component instances and the edge buffer.
pub struct Executor {
    /// Indexed by `NodeId`.
    instances: Vec<Box<dyn ProcessNode>>,
    buffer: EdgeBuffer,
    settings: SolverSettings,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("instances", &self.instances.len())
            .field("buffer", &self.buffer)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Executor {
    /// `instances[i]` is bound to `NodeId(i)`.
    pub fn new(
        graph: &FlowsheetGraph,
        instances: Vec<Box<dyn ProcessNode>>,
        settings: SolverSettings,
    ) -> Self {
        Executor {
            instances,
            buffer: EdgeBuffer::new(graph, settings.stream_width),
            settings,
        }
    }

    pub fn buffer(&self) -> &EdgeBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut EdgeBuffer {
        &mut self.buffer
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Runs every stage of `schedule` once, in order.
    pub fn step(
        &mut self,
        graph: &FlowsheetGraph,
        schedule: &Schedule,
        dt: f64,
    ) -> Result<StepReport, ExecError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ExecError::InvalidTimeStep { dt });
        }

        let mut report = StepReport::default();
        for stage in schedule.stages() {
            match stage {
                Stage::Acyclic { node, .. } => self.run_node(graph, *node, dt)?,
                Stage::Loop {
                    component,
                    internal_order,
                    tear_edges,
                    ..
                } => {
                    let outcome = self.run_loop(graph, *component, internal_order, tear_edges, dt)?;
                    report.loops.push(outcome);
                }
            }
        }
        Ok(report)
    }

    /// Gathers `node`'s inputs from the buffer, steps it and writes its
    /// outputs back onto its outgoing edges.
    fn run_node(&mut self, graph: &FlowsheetGraph, node: NodeId, dt: f64) -> Result<(), ExecError> {
        let mut inputs = Ports::new();
        for &e in graph.incoming(node) {
            inputs.insert(graph.edge(e).target_port.clone(), self.buffer.read(e));
        }

        let instance = self
            .instances
            .get_mut(node.index())
            .ok_or_else(|| ExecError::MissingInstance {
                node: graph.node_name(node).to_string(),
            })?;
        let outputs = instance
            .step(dt, &inputs)
            .map_err(|source| ExecError::NodeFailed {
                node: graph.node_name(node).to_string(),
                source,
            })?;

        for &e in graph.outgoing(node) {
            if let Some(value) = outputs.get(&graph.edge(e).source_port) {
                self.buffer.write(e, value.clone());
            }
        }
        Ok(())
    }

    fn run_loop(
        &mut self,
        graph: &FlowsheetGraph,
        component: SccId,
        internal_order: &[NodeId],
        tear_edges: &[EdgeId],
        dt: f64,
    ) -> Result<LoopOutcome, ExecError> {
        for &e in tear_edges {
            self.buffer.seed_zero(e);
        }

        let SolverSettings {
            tolerance,
            max_iter,
            relax,
            ..
        } = self.settings;
        let mut outcome = LoopOutcome {
            component,
            sweeps: 0,
            residual: f64::INFINITY,
            converged: false,
        };

        for sweep in 1..=max_iter {
            let snapshot: Vec<Stream> = tear_edges.iter().map(|&e| self.buffer.read(e)).collect();
            for &node in internal_order {
                self.run_node(graph, node, dt)?;
            }

            let mut residual: f64 = 0.0;
            for (&e, old) in tear_edges.iter().zip(&snapshot) {
                let fresh = self.buffer.read(e);
                let change = match Stream::relax(old, &fresh, relax) {
                    Some(relaxed) => {
                        let change = relaxed.max_abs_diff(old).unwrap_or(f64::INFINITY);
                        self.buffer.write(e, relaxed);
                        change
                    }
                    // Producer changed shape: adopt the new value as is.
                    None => {
                        self.buffer.write(e, fresh);
                        f64::INFINITY
                    }
                };
                residual = residual.max(change);
            }
            debug!(component = component.0, sweep, residual, "loop sweep");

            outcome.sweeps = sweep;
            outcome.residual = residual;
            if residual < tolerance {
                outcome.converged = true;
                break;
            }
        }

        if !outcome.converged {
            warn!(
                component = component.0,
                sweeps = outcome.sweeps,
                residual = outcome.residual,
                tolerance,
                "loop stage did not converge"
            );
        }
        Ok(outcome)
    }
}
