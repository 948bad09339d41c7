//! Stage planning: from SCCs to an ordered execution plan.
//!
//! 1. Contract each SCC to a vertex ([`Condensation`]).
//! 2. Order the condensation with Kahn's algorithm.
//! 3. Emit one stage per SCC: an acyclic stage for a singleton without a
//!    self-loop, otherwise a loop stage whose tear edges and internal order
//!    come from [`tear::linearize`].

pub mod condensation;
pub mod tear;

use tracing::{debug, info};

use flowsheet_core::FlowsheetGraph;

use crate::error::PlanningError;
use crate::scc::{decompose_graph, SccDecomposition};
use crate::schedule::{Schedule, Stage};

pub use condensation::Condensation;
pub use tear::{LoopLayout, MAX_TEAR_ATTEMPTS};

/// Builds the execution plan for `graph` from its SCC decomposition.
pub fn plan(graph: &FlowsheetGraph, sccs: &SccDecomposition) -> Result<Schedule, PlanningError> {
    let condensation = Condensation::build(graph, sccs);
    let component_order = condensation.topological_order(sccs)?;

    let mut stages = Vec::with_capacity(component_order.len());
    for &component in &component_order {
        let members = sccs.members(component);
        if !sccs.is_cyclic(component, graph) {
            stages.push(Stage::Acyclic {
                component,
                node: members[0],
            });
            continue;
        }

        let layout = tear::linearize(graph, members, |n| sccs.scc_of(n) == component)?;
        debug!(
            component = component.0,
            nodes = members.len(),
            tears = layout.tear_edges.len(),
            "planned loop stage"
        );
        stages.push(Stage::Loop {
            component,
            nodes: members.to_vec(),
            internal_order: layout.internal_order,
            tear_edges: layout.tear_edges,
        });
    }

    let schedule = Schedule::new(stages, sccs.node_to_scc().to_vec(), component_order);
    info!(
        stages = schedule.stages().len(),
        loops = schedule.loop_count(),
        "execution plan built"
    );
    Ok(schedule)
}

/// Runs the full build pipeline on an already-built graph: SCC
/// decomposition followed by [`plan`].
pub fn plan_graph(graph: &FlowsheetGraph) -> Result<Schedule, PlanningError> {
    let sccs = decompose_graph(graph);
    plan(graph, &sccs)
}
