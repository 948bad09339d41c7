//! The execution plan: an ordered list of stages.
//!
//! A [`Schedule`] is immutable once built and can drive any number of time
//! steps as long as the graph topology stays the same. Besides the stages it
//! keeps the node -> component and component -> stage lookups used for
//! diagnostics, and it can re-check its own structure against a graph.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use flowsheet_core::{EdgeId, FlowsheetGraph, NodeId};

use crate::error::PlanningError;
use crate::scc::SccId;

/// One unit of the execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    /// A single node outside any cycle, run once per time step.
    Acyclic { component: SccId, node: NodeId },
    /// A cyclic component, swept repeatedly until its tear edges settle.
    Loop {
        component: SccId,
        /// Members sorted by node id.
        nodes: Vec<NodeId>,
        /// Sweep order; respects every non-torn edge inside the component.
        internal_order: Vec<NodeId>,
        /// Edges whose values carry over between sweeps.
        tear_edges: Vec<EdgeId>,
    },
}

impl Stage {
    pub fn component(&self) -> SccId {
        match self {
            Stage::Acyclic { component, .. } | Stage::Loop { component, .. } => *component,
        }
    }

    /// Nodes in the order the executor runs them within one pass.
    pub fn execution_order(&self) -> &[NodeId] {
        match self {
            Stage::Acyclic { node, .. } => std::slice::from_ref(node),
            Stage::Loop { internal_order, .. } => internal_order,
        }
    }

    /// Tear edges (empty for acyclic stages).
    pub fn tear_edges(&self) -> &[EdgeId] {
        match self {
            Stage::Acyclic { .. } => &[],
            Stage::Loop { tear_edges, .. } => tear_edges,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Stage::Loop { .. })
    }
}

/// The published execution plan.
///
/// Deserialized plans go through the same consistency checks as
/// [`ScheduleParts`] before the lookups are rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleParts")]
pub struct Schedule {
    stages: Vec<Stage>,
    /// Component of each node, indexed by `NodeId`.
    node_to_scc: Vec<SccId>,
    /// Stage index of each component, indexed by `SccId`.
    #[serde(skip_serializing)]
    scc_position: Vec<usize>,
    /// Components in execution order.
    component_order: Vec<SccId>,
}

impl Schedule {
    pub(crate) fn new(stages: Vec<Stage>, node_to_scc: Vec<SccId>, component_order: Vec<SccId>) -> Self {
        let mut scc_position = vec![0; component_order.len()];
        for (position, stage) in stages.iter().enumerate() {
            scc_position[stage.component().index()] = position;
        }
        Schedule {
            stages,
            node_to_scc,
            scc_position,
            component_order,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The component a node belongs to.
    pub fn scc_of(&self, node: NodeId) -> SccId {
        self.node_to_scc[node.index()]
    }

    /// Index into [`stages`](Self::stages) of a component's stage.
    pub fn position_of(&self, component: SccId) -> usize {
        self.scc_position[component.index()]
    }

    /// Index of the stage that runs `node`.
    pub fn stage_of(&self, node: NodeId) -> usize {
        self.position_of(self.scc_of(node))
    }

    pub fn component_order(&self) -> &[SccId] {
        &self.component_order
    }

    pub fn component_count(&self) -> usize {
        self.component_order.len()
    }

    /// Number of loop stages.
    pub fn loop_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_loop()).count()
    }

    /// All tear edges across all loop stages.
    pub fn tear_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.stages.iter().flat_map(|s| s.tear_edges().iter().copied())
    }

    /// Re-checks the structural guarantees of the plan against `graph`:
    ///
    /// - every node appears in exactly one stage, exactly once;
    /// - every non-torn edge goes forward: to a later stage, or to a later
    ///   slot in the same loop's internal order;
    /// - the graph minus all tear edges is acyclic.
    pub fn validate(&self, graph: &FlowsheetGraph) -> Result<(), PlanningError> {
        let invalid = |reason: String| Err(PlanningError::InvalidSchedule { reason });

        if self.node_to_scc.len() != graph.node_count() {
            return invalid(format!(
                "plan covers {} nodes, graph has {}",
                self.node_to_scc.len(),
                graph.node_count()
            ));
        }

        // Slot of each node: (stage index, position within the stage).
        let mut slot: Vec<Option<(usize, usize)>> = vec![None; graph.node_count()];
        for (stage_index, stage) in self.stages.iter().enumerate() {
            if let Stage::Loop { nodes, internal_order, .. } = stage {
                let declared: HashSet<_> = nodes.iter().collect();
                let ordered: HashSet<_> = internal_order.iter().collect();
                if declared != ordered || nodes.len() != internal_order.len() {
                    return invalid(format!(
                        "loop stage {} internal order does not match its members",
                        stage_index
                    ));
                }
            }
            for (position, &node) in stage.execution_order().iter().enumerate() {
                let Some(entry) = slot.get_mut(node.index()) else {
                    return invalid(format!("stage {} names unknown node {}", stage_index, node));
                };
                if entry.is_some() {
                    return invalid(format!("node '{}' is scheduled twice", graph.node_name(node)));
                }
                *entry = Some((stage_index, position));
            }
        }
        if let Some(missing) = slot.iter().position(Option::is_none) {
            return invalid(format!(
                "node '{}' is not scheduled",
                graph.node_name(NodeId(missing as u32))
            ));
        }

        let torn: HashSet<EdgeId> = self.tear_edges().collect();
        for id in graph.edge_ids() {
            if torn.contains(&id) {
                continue;
            }
            let edge = graph.edge(id);
            let (Some(from), Some(to)) = (slot[edge.source.index()], slot[edge.target.index()]) else {
                continue;
            };
            let forward = from.0 < to.0
                || (from.0 == to.0 && self.stages[from.0].is_loop() && from.1 < to.1);
            if !forward {
                return invalid(format!(
                    "edge '{}' runs backwards and is not torn",
                    graph.edge_name(id)
                ));
            }
        }

        let reduced = graph
            .to_digraph()
            .filter_map(|_, n| Some(*n), |_, e| (!torn.contains(e)).then_some(*e));
        if petgraph::algo::toposort(&reduced, None).is_err() {
            return invalid("graph minus tear edges is still cyclic".to_string());
        }
        Ok(())
    }

    /// A serializable view of the plan using the flowsheet's string ids.
    pub fn report(&self, graph: &FlowsheetGraph) -> ScheduleReport {
        let names = |nodes: &[NodeId]| -> Vec<String> {
            nodes.iter().map(|&n| graph.node_name(n).to_string()).collect()
        };
        let stages = self
            .stages
            .iter()
            .map(|stage| match stage {
                Stage::Acyclic { component, node } => StageReport::Acyclic {
                    component: component.0,
                    node: graph.node_name(*node).to_string(),
                },
                Stage::Loop {
                    component,
                    nodes,
                    internal_order,
                    tear_edges,
                } => StageReport::Loop {
                    component: component.0,
                    nodes: names(nodes),
                    internal_order: names(internal_order),
                    tear_edges: tear_edges
                        .iter()
                        .map(|&e| graph.edge_name(e).to_string())
                        .collect(),
                },
            })
            .collect();
        let node_to_component = graph
            .node_ids()
            .map(|n| (graph.node_name(n).to_string(), self.scc_of(n).0))
            .collect();

        ScheduleReport {
            component_count: self.component_count(),
            component_order: self.component_order.iter().map(|c| c.0).collect(),
            stages,
            node_to_component,
        }
    }
}

/// Serialized form of a [`Schedule`] without the derived lookups.
#[derive(Deserialize)]
struct ScheduleParts {
    stages: Vec<Stage>,
    node_to_scc: Vec<SccId>,
    component_order: Vec<SccId>,
}

impl TryFrom<ScheduleParts> for Schedule {
    type Error = PlanningError;

    fn try_from(parts: ScheduleParts) -> Result<Self, Self::Error> {
        let invalid = |reason: String| PlanningError::InvalidSchedule { reason };
        let count = parts.component_order.len();

        if parts.stages.len() != count {
            return Err(invalid(format!(
                "{} stages for {} components",
                parts.stages.len(),
                count
            )));
        }
        let mut seen = vec![false; count];
        for &component in &parts.component_order {
            match seen.get_mut(component.index()) {
                Some(flag) if !*flag => *flag = true,
                _ => {
                    return Err(invalid(format!(
                        "component {} is out of range or repeated",
                        component.0
                    )))
                }
            }
        }
        for (position, (stage, &component)) in
            parts.stages.iter().zip(&parts.component_order).enumerate()
        {
            if stage.component() != component {
                return Err(invalid(format!(
                    "stage {} runs component {}, expected {}",
                    position,
                    stage.component().0,
                    component.0
                )));
            }
            for &node in stage.execution_order() {
                if parts.node_to_scc.get(node.index()) != Some(&component) {
                    return Err(invalid(format!(
                        "node {} is not a member of component {}",
                        node, component.0
                    )));
                }
            }
        }
        if let Some(component) = parts.node_to_scc.iter().find(|c| c.index() >= count) {
            return Err(invalid(format!("unknown component {}", component.0)));
        }

        Ok(Schedule::new(
            parts.stages,
            parts.node_to_scc,
            parts.component_order,
        ))
    }
}

/// String-keyed view of a [`Schedule`] for printing and test assertions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub component_count: usize,
    pub component_order: Vec<u32>,
    pub stages: Vec<StageReport>,
    pub node_to_component: IndexMap<String, u32>,
}

/// String-keyed view of a [`Stage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageReport {
    Acyclic {
        component: u32,
        node: String,
    },
    Loop {
        component: u32,
        nodes: Vec<String>,
        internal_order: Vec<String>,
        tear_edges: Vec<String>,
    },
}
