//! Tear-edge selection and internal ordering for cyclic components.
//!
//! A cyclic component is linearized by removing ("tearing") edges until the
//! rest is acyclic. Tears are picked as DFS back edges over the component's
//! induced subgraph. They are concrete edges, never node pairs, so parallel
//! edges between the same two nodes are handled individually.
//!
//! DFS roots are the component's entry nodes first (members fed from outside
//! the component, e.g. the mixer where fresh influent meets the recycle),
//! then the remaining members in declaration order. Starting at the entry
//! makes the torn edges the ones returning into it, which are the recycle
//! streams an engineer would pick by hand.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use tracing::debug;

use flowsheet_core::{EdgeId, FlowsheetGraph, NodeId};

use crate::error::PlanningError;

/// How many rounds of tear detection a component gets before planning fails.
pub const MAX_TEAR_ATTEMPTS: usize = 2;

/// Execution layout of one cyclic component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLayout {
    /// Members in an order that respects every non-torn edge.
    pub internal_order: Vec<NodeId>,
    /// Torn edges, sorted by edge id.
    pub tear_edges: Vec<EdgeId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Selects tear edges for the component `members` and orders its nodes.
///
/// `in_component` must return `true` exactly for the members. Each attempt
/// runs tear detection on the edges not torn so far and then tries to order
/// the remaining subgraph.
pub fn linearize(
    graph: &FlowsheetGraph,
    members: &[NodeId],
    in_component: impl Fn(NodeId) -> bool,
) -> Result<LoopLayout, PlanningError> {
    let roots = dfs_roots(graph, members, &in_component);
    let mut torn: BTreeSet<EdgeId> = BTreeSet::new();

    for attempt in 1..=MAX_TEAR_ATTEMPTS {
        let found = detect_tears(graph, &roots, &in_component, &torn);
        torn.extend(found);
        if let Some(internal_order) = internal_order(graph, members, &in_component, &torn) {
            return Ok(LoopLayout {
                internal_order,
                tear_edges: torn.into_iter().collect(),
            });
        }
        debug!(
            attempt,
            tears = torn.len(),
            "cyclic component still cyclic after tearing"
        );
    }

    Err(unlinearizable(graph, members))
}

fn unlinearizable(graph: &FlowsheetGraph, members: &[NodeId]) -> PlanningError {
    PlanningError::Unlinearizable {
        nodes: members
            .iter()
            .map(|&n| graph.node_name(n).to_string())
            .collect(),
        attempts: MAX_TEAR_ATTEMPTS,
    }
}

/// Entry members (fed from outside) first, then the rest; each group in
/// declaration order.
fn dfs_roots(
    graph: &FlowsheetGraph,
    members: &[NodeId],
    in_component: &impl Fn(NodeId) -> bool,
) -> Vec<NodeId> {
    let is_entry = |n: NodeId| {
        graph
            .incoming(n)
            .iter()
            .any(|&e| !in_component(graph.edge(e).source))
    };
    let mut roots: Vec<NodeId> = members.to_vec();
    roots.sort_by_key(|&n| (!is_entry(n), n));
    roots
}

/// Back edges of a white/gray/black DFS over the induced subgraph, skipping
/// edges in `excluded`.
fn detect_tears(
    graph: &FlowsheetGraph,
    roots: &[NodeId],
    in_component: &impl Fn(NodeId) -> bool,
    excluded: &BTreeSet<EdgeId>,
) -> Vec<EdgeId> {
    let mut color = vec![Color::White; graph.node_count()];
    let mut tears = Vec::new();
    // (node, position in its outgoing edge list)
    let mut frames: Vec<(NodeId, usize)> = Vec::new();

    for &root in roots {
        if color[root.index()] != Color::White {
            continue;
        }
        color[root.index()] = Color::Gray;
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let (u, position) = *frame;
            frame.1 += 1;
            let Some(&edge_id) = graph.outgoing(u).get(position) else {
                color[u.index()] = Color::Black;
                frames.pop();
                continue;
            };

            if excluded.contains(&edge_id) {
                continue;
            }
            let v = graph.edge(edge_id).target;
            if !in_component(v) {
                continue;
            }
            match color[v.index()] {
                Color::White => {
                    color[v.index()] = Color::Gray;
                    frames.push((v, 0));
                }
                // v is an ancestor of u on the current DFS path.
                Color::Gray => tears.push(edge_id),
                Color::Black => {}
            }
        }
    }
    tears
}

/// Kahn's algorithm over the component minus `torn`. Returns `None` if a
/// cycle remains. Ties go to the earliest-declared node.
fn internal_order(
    graph: &FlowsheetGraph,
    members: &[NodeId],
    in_component: &impl Fn(NodeId) -> bool,
    torn: &BTreeSet<EdgeId>,
) -> Option<Vec<NodeId>> {
    let kept = |e: EdgeId| !torn.contains(&e) && in_component(graph.edge(e).target);

    let mut in_degree = vec![0usize; graph.node_count()];
    for &u in members {
        for &e in graph.outgoing(u) {
            if kept(e) {
                in_degree[graph.edge(e).target.index()] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeId>> = members
        .iter()
        .filter(|n| in_degree[n.index()] == 0)
        .map(|&n| Reverse(n))
        .collect();
    let mut order = Vec::with_capacity(members.len());
    while let Some(Reverse(u)) = ready.pop() {
        order.push(u);
        for &e in graph.outgoing(u) {
            if kept(e) {
                let v = graph.edge(e).target;
                in_degree[v.index()] -= 1;
                if in_degree[v.index()] == 0 {
                    ready.push(Reverse(v));
                }
            }
        }
    }

    (order.len() == members.len()).then_some(order)
}
