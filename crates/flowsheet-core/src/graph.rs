//! FlowsheetGraph: the validated, indexed form of a flowsheet document.
//!
//! [`FlowsheetGraph::build`] turns the declarative node and edge records into
//! the adjacency structures the planner and executor work on:
//!
//! - forward adjacency (node -> successor nodes, one entry per edge, so
//!   parallel edges are preserved),
//! - incoming and outgoing edge lists per node (used to gather inputs and
//!   scatter outputs),
//! - a `(source, target) -> [EdgeId]` index,
//! - the set of nodes carrying a self-loop.
//!
//! Every list is kept in declaration order. Nodes and edges are stored in
//! [`IndexMap`]s keyed by their string id, so the map position doubles as the
//! dense [`NodeId`] / [`EdgeId`].
//!
//! The graph is immutable once built. A topology change means building a new
//! graph (and a new schedule) from the edited document.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::graph::DiGraph;

use crate::error::ConfigError;
use crate::id::{EdgeId, NodeId};
use crate::spec::{FlowsheetSpec, NodeSpec};

/// A node together with its edge references.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The declarative record this node was built from.
    pub spec: NodeSpec,
    /// Edges whose target is this node, in declaration order.
    pub incoming: Vec<EdgeId>,
    /// Edges whose source is this node, in declaration order.
    pub outgoing: Vec<EdgeId>,
}

/// A resolved edge: string ids replaced by dense node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source: NodeId,
    pub source_port: String,
    pub target: NodeId,
    pub target_port: String,
    /// Declared vector width, if any.
    pub width: Option<usize>,
}

impl GraphEdge {
    /// Returns `true` if the edge starts and ends at the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// The indexed flowsheet graph.
#[derive(Debug, Clone)]
pub struct FlowsheetGraph {
    nodes: IndexMap<String, GraphNode>,
    edges: IndexMap<String, GraphEdge>,
    /// Forward adjacency indexed by `NodeId`.
    successors: Vec<Vec<NodeId>>,
    /// Self-loop flags indexed by `NodeId`.
    self_loops: Vec<bool>,
    edges_by_pair: HashMap<(NodeId, NodeId), Vec<EdgeId>>,
}

impl FlowsheetGraph {
    /// Validates a flowsheet document and builds its adjacency structures.
    ///
    /// Fails on duplicate node or edge ids, on edges referencing undeclared
    /// nodes, on empty port names, and when two edges feed the same input
    /// port of one node.
    pub fn build(spec: &FlowsheetSpec) -> Result<Self, ConfigError> {
        let mut nodes: IndexMap<String, GraphNode> = IndexMap::with_capacity(spec.nodes.len());
        for node in &spec.nodes {
            if nodes.contains_key(&node.id) {
                return Err(ConfigError::DuplicateNode { id: node.id.clone() });
            }
            nodes.insert(
                node.id.clone(),
                GraphNode {
                    spec: node.clone(),
                    incoming: Vec::new(),
                    outgoing: Vec::new(),
                },
            );
        }

        let mut edges: IndexMap<String, GraphEdge> = IndexMap::with_capacity(spec.edges.len());
        let mut successors = vec![Vec::new(); nodes.len()];
        let mut self_loops = vec![false; nodes.len()];
        let mut edges_by_pair: HashMap<(NodeId, NodeId), Vec<EdgeId>> = HashMap::new();
        let mut port_feeds: HashMap<(NodeId, String), EdgeId> = HashMap::new();

        for edge in &spec.edges {
            if edges.contains_key(&edge.id) {
                return Err(ConfigError::DuplicateEdge { id: edge.id.clone() });
            }
            let lookup = |name: &str| {
                nodes
                    .get_index_of(name)
                    .map(|i| NodeId(i as u32))
                    .ok_or_else(|| ConfigError::UnknownNode {
                        edge: edge.id.clone(),
                        node: name.to_string(),
                    })
            };
            let source = lookup(&edge.source_node_id)?;
            let target = lookup(&edge.target_node_id)?;
            if edge.source_handle_id.is_empty() || edge.target_handle_id.is_empty() {
                return Err(ConfigError::EmptyPort { edge: edge.id.clone() });
            }

            let edge_id = EdgeId(edges.len() as u32);
            if let Some(&first) = port_feeds.get(&(target, edge.target_handle_id.clone())) {
                return Err(ConfigError::DuplicateInputPort {
                    node: edge.target_node_id.clone(),
                    port: edge.target_handle_id.clone(),
                    first: edges[first.index()].id.clone(),
                    second: edge.id.clone(),
                });
            }
            port_feeds.insert((target, edge.target_handle_id.clone()), edge_id);

            successors[source.index()].push(target);
            if source == target {
                self_loops[source.index()] = true;
            }
            edges_by_pair.entry((source, target)).or_default().push(edge_id);
            nodes[source.index()].outgoing.push(edge_id);
            nodes[target.index()].incoming.push(edge_id);

            edges.insert(
                edge.id.clone(),
                GraphEdge {
                    id: edge.id.clone(),
                    source,
                    source_port: edge.source_handle_id.clone(),
                    target,
                    target_port: edge.target_handle_id.clone(),
                    width: edge.width,
                },
            );
        }

        Ok(FlowsheetGraph {
            nodes,
            edges,
            successors,
            self_loops,
            edges_by_pair,
        })
    }

    // -----------------------------------------------------------------------
    // Sizes and id iteration
    // -----------------------------------------------------------------------

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All node ids in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// All edge ids in declaration order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(|i| EdgeId(i as u32))
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// The node with the given dense id.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.index()]
    }

    /// The edge with the given dense id.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this graph.
    pub fn edge(&self, id: EdgeId) -> &GraphEdge {
        &self.edges[id.index()]
    }

    /// Resolves a node's string id.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.get_index_of(name).map(|i| NodeId(i as u32))
    }

    /// Resolves an edge's string id.
    pub fn edge_id(&self, name: &str) -> Option<EdgeId> {
        self.edges.get_index_of(name).map(|i| EdgeId(i as u32))
    }

    /// The string id of a node.
    pub fn node_name(&self, id: NodeId) -> &str {
        &self.node(id).spec.id
    }

    /// The string id of an edge.
    pub fn edge_name(&self, id: EdgeId) -> &str {
        &self.edge(id).id
    }

    // -----------------------------------------------------------------------
    // Adjacency
    // -----------------------------------------------------------------------

    /// Forward adjacency, indexed by `NodeId`.
    pub fn adjacency(&self) -> &[Vec<NodeId>] {
        &self.successors
    }

    /// Successor nodes of `id`, one entry per outgoing edge.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id.index()]
    }

    /// Edges ending at `id`.
    pub fn incoming(&self, id: NodeId) -> &[EdgeId] {
        &self.node(id).incoming
    }

    /// Edges starting at `id`.
    pub fn outgoing(&self, id: NodeId) -> &[EdgeId] {
        &self.node(id).outgoing
    }

    /// Returns `true` if `id` has an edge to itself.
    pub fn has_self_loop(&self, id: NodeId) -> bool {
        self.self_loops[id.index()]
    }

    /// Edges from `source` to `target`, in declaration order.
    pub fn edges_between(&self, source: NodeId, target: NodeId) -> &[EdgeId] {
        self.edges_by_pair
            .get(&(source, target))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Builds a petgraph view with matching indices: node `i` is `NodeId(i)`
    /// and edge `j` is `EdgeId(j)`.
    pub fn to_digraph(&self) -> DiGraph<NodeId, EdgeId, u32> {
        let mut graph = DiGraph::with_capacity(self.node_count(), self.edge_count());
        for id in self.node_ids() {
            graph.add_node(id);
        }
        for id in self.edge_ids() {
            let edge = self.edge(id);
            graph.add_edge(edge.source.into(), edge.target.into(), id);
        }
        graph
    }
}
