//! Edge value buffer.
//!
//! Holds the most recent value produced on every edge. It outlives individual
//! time steps, so a loop stage's tear edges start each step from the value
//! they converged to in the previous one.

use flowsheet_core::{EdgeId, FlowsheetGraph, Stream};

/// Edge id -> last produced value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeBuffer {
    values: Vec<Option<Stream>>,
    /// Width of the zero default for each edge.
    widths: Vec<usize>,
}

impl EdgeBuffer {
    /// An empty buffer sized for `graph`. Edges without a declared width
    /// default to `default_width` entries.
    pub fn new(graph: &FlowsheetGraph, default_width: usize) -> Self {
        let widths = graph
            .edge_ids()
            .map(|e| graph.edge(e).width.unwrap_or(default_width))
            .collect();
        EdgeBuffer {
            values: vec![None; graph.edge_count()],
            widths,
        }
    }

    /// The stored value, if the edge has ever been written.
    pub fn get(&self, edge: EdgeId) -> Option<&Stream> {
        self.values.get(edge.index()).and_then(Option::as_ref)
    }

    /// The stored value, or zeros of the edge's width when nothing has been
    /// produced yet.
    pub fn read(&self, edge: EdgeId) -> Stream {
        match self.get(edge) {
            Some(value) => value.clone(),
            None => Stream::zeros(self.width_of(edge)),
        }
    }

    pub fn write(&mut self, edge: EdgeId, value: Stream) {
        self.values[edge.index()] = Some(value);
    }

    /// Writes zeros to `edge` unless it already holds a value.
    pub fn seed_zero(&mut self, edge: EdgeId) {
        if self.values[edge.index()].is_none() {
            self.values[edge.index()] = Some(Stream::zeros(self.width_of(edge)));
        }
    }

    pub fn width_of(&self, edge: EdgeId) -> usize {
        self.widths[edge.index()]
    }

    /// Number of edges that currently hold a value.
    pub fn populated(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Copies values from `previous` (built for `old_graph`) onto edges of
    /// `new_graph` with the same string id, the same endpoints and the same
    /// width. Returns how many were carried.
    pub fn carry_over(
        &mut self,
        new_graph: &FlowsheetGraph,
        previous: &EdgeBuffer,
        old_graph: &FlowsheetGraph,
    ) -> usize {
        let mut carried = 0;
        for old_id in old_graph.edge_ids() {
            let Some(value) = previous.get(old_id) else {
                continue;
            };
            let Some(new_id) = new_graph.edge_id(old_graph.edge_name(old_id)) else {
                continue;
            };
            let (old_edge, new_edge) = (old_graph.edge(old_id), new_graph.edge(new_id));
            let same_endpoints = old_graph.node_name(old_edge.source)
                == new_graph.node_name(new_edge.source)
                && old_graph.node_name(old_edge.target) == new_graph.node_name(new_edge.target);
            if same_endpoints && previous.width_of(old_id) == self.width_of(new_id) {
                self.write(new_id, value.clone());
                carried += 1;
            }
        }
        carried
    }
}
