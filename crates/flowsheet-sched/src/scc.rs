//! Strongly connected component decomposition (Tarjan).
//!
//! Separates the feed-forward parts of a flowsheet from its recycle regions.
//! The search is iterative, so deep chains cannot overflow the call stack,
//! and it visits roots in node declaration order and successors in edge
//! declaration order. Two decompositions of the same adjacency are therefore
//! identical, including component numbering.
//!
//! Components are numbered in the order Tarjan closes them, which is a
//! reverse topological order of the condensation graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use flowsheet_core::{FlowsheetGraph, NodeId};

/// Identifier of a strongly connected component within one decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SccId(pub u32);

impl SccId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SccId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The SCCs of a graph and the node -> SCC map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccDecomposition {
    /// Members of each component, sorted by node id.
    components: Vec<Vec<NodeId>>,
    /// Component of each node, indexed by `NodeId`.
    node_to_scc: Vec<SccId>,
}

impl SccDecomposition {
    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// All components, indexed by `SccId`.
    pub fn components(&self) -> &[Vec<NodeId>] {
        &self.components
    }

    /// Members of one component, sorted by node id.
    pub fn members(&self, id: SccId) -> &[NodeId] {
        &self.components[id.index()]
    }

    /// The component containing `node`.
    pub fn scc_of(&self, node: NodeId) -> SccId {
        self.node_to_scc[node.index()]
    }

    /// The node -> component map, indexed by `NodeId`.
    pub fn node_to_scc(&self) -> &[SccId] {
        &self.node_to_scc
    }

    /// Returns `true` if the component needs iterative treatment: more than
    /// one member, or a single member with an edge to itself.
    pub fn is_cyclic(&self, id: SccId, graph: &FlowsheetGraph) -> bool {
        match self.members(id) {
            [single] => graph.has_self_loop(*single),
            _ => true,
        }
    }
}

const UNVISITED: usize = usize::MAX;

struct Frame {
    node: usize,
    next_successor: usize,
}

/// Runs Tarjan's algorithm over `adjacency`, where `adjacency[i]` lists the
/// successors of `NodeId(i)` (one entry per edge).
pub fn decompose(adjacency: &[Vec<NodeId>]) -> SccDecomposition {
    let n = adjacency.len();
    let mut index = vec![UNVISITED; n];
    let mut low_link = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut next_index = 0usize;

    let mut components: Vec<Vec<NodeId>> = Vec::new();
    let mut node_to_scc = vec![SccId(0); n];

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        low_link[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        frames.push(Frame {
            node: root,
            next_successor: 0,
        });

        while let Some(frame) = frames.last_mut() {
            let v = frame.node;
            if let Some(w) = adjacency[v].get(frame.next_successor) {
                frame.next_successor += 1;
                let w = w.index();
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    low_link[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    frames.push(Frame {
                        node: w,
                        next_successor: 0,
                    });
                } else if on_stack[w] {
                    low_link[v] = low_link[v].min(index[w]);
                }
                continue;
            }

            // All successors of v explored.
            frames.pop();
            if let Some(parent) = frames.last() {
                let p = parent.node;
                low_link[p] = low_link[p].min(low_link[v]);
            }
            if low_link[v] == index[v] {
                let id = SccId(components.len() as u32);
                let mut members = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    node_to_scc[w] = id;
                    members.push(NodeId(w as u32));
                    if w == v {
                        break;
                    }
                }
                members.sort();
                components.push(members);
            }
        }
    }

    SccDecomposition {
        components,
        node_to_scc,
    }
}

/// Decomposes a built flowsheet graph.
pub fn decompose_graph(graph: &FlowsheetGraph) -> SccDecomposition {
    decompose(graph.adjacency())
}
