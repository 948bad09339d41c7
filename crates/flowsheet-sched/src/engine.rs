//! Engine facade: build, decompose, plan, instantiate, execute.
//!
//! An [`Engine`] owns one flowsheet's graph, its schedule and the executor
//! holding the component instances and edge values. Changing the topology
//! goes through [`Engine::rebuild`], which reruns the whole pipeline.

use tracing::info;

use flowsheet_core::{FlowsheetGraph, FlowsheetSpec, SolverSettings, Stream};

use crate::error::{EngineError, ExecError};
use crate::executor::{Executor, StepReport};
use crate::plan::plan_graph;
use crate::registry::NodeRegistry;
use crate::schedule::Schedule;

/// A flowsheet ready to be stepped.
#[derive(Debug)]
pub struct Engine<'r> {
    registry: &'r NodeRegistry,
    graph: FlowsheetGraph,
    schedule: Schedule,
    executor: Executor,
}

impl<'r> Engine<'r> {
    /// Validates `settings`, builds the graph, plans it and instantiates
    /// every node through `registry`.
    pub fn new(
        spec: &FlowsheetSpec,
        registry: &'r NodeRegistry,
        settings: SolverSettings,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        let graph = FlowsheetGraph::build(spec)?;
        let schedule = plan_graph(&graph)?;
        let instances = registry.instantiate_all(&graph)?;
        let executor = Executor::new(&graph, instances, settings);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            stages = schedule.stages().len(),
            "engine ready"
        );
        Ok(Engine {
            registry,
            graph,
            schedule,
            executor,
        })
    }

    /// Like [`new`](Self::new), taking settings from the flowsheet's
    /// `solver` block or the defaults.
    pub fn from_spec(spec: &FlowsheetSpec, registry: &'r NodeRegistry) -> Result<Self, EngineError> {
        Self::new(spec, registry, spec.solver.unwrap_or_default())
    }

    pub fn graph(&self) -> &FlowsheetGraph {
        &self.graph
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn settings(&self) -> &SolverSettings {
        self.executor.settings()
    }

    /// Advances every component by one time step of length `dt`.
    pub fn step(&mut self, dt: f64) -> Result<StepReport, EngineError> {
        Ok(self.executor.step(&self.graph, &self.schedule, dt)?)
    }

    /// Steps at `t = 0, timestep, 2 * timestep, ...` while `t <= endtime`,
    /// returning one report per step.
    pub fn simulate(&mut self, timestep: f64, endtime: f64) -> Result<Vec<StepReport>, EngineError> {
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(ExecError::InvalidTimeStep { dt: timestep }.into());
        }
        let mut reports = Vec::new();
        let mut k = 0u64;
        while (k as f64) * timestep <= endtime {
            reports.push(self.step(timestep)?);
            k += 1;
        }
        let unconverged = reports.iter().filter(|r| !r.converged()).count();
        info!(steps = reports.len(), unconverged, "simulation finished");
        Ok(reports)
    }

    /// Current value of the edge with string id `edge`, if it exists and has
    /// been produced.
    pub fn edge_value(&self, edge: &str) -> Option<&Stream> {
        let id = self.graph.edge_id(edge)?;
        self.executor.buffer().get(id)
    }

    /// Replaces the flowsheet with `spec` and reruns the full pipeline.
    ///
    /// Component instances are rebuilt from scratch. Edge values carry over
    /// for every edge whose id, endpoints and width survive, so recycle loops
    /// keep their warm start. On error the engine is left unchanged.
    pub fn rebuild(&mut self, spec: &FlowsheetSpec) -> Result<(), EngineError> {
        let graph = FlowsheetGraph::build(spec)?;
        let schedule = plan_graph(&graph)?;
        let instances = self.registry.instantiate_all(&graph)?;
        let settings = *self.executor.settings();

        let mut executor = Executor::new(&graph, instances, settings);
        let carried = executor
            .buffer_mut()
            .carry_over(&graph, self.executor.buffer(), &self.graph);
        info!(
            nodes = graph.node_count(),
            stages = schedule.stages().len(),
            carried,
            "engine rebuilt"
        );

        self.graph = graph;
        self.schedule = schedule;
        self.executor = executor;
        Ok(())
    }
}
