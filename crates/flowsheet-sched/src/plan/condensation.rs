//! Condensation graph and its topological order.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use flowsheet_core::FlowsheetGraph;

use crate::error::PlanningError;
use crate::scc::{SccDecomposition, SccId};

/// One vertex per SCC, one arc per pair of SCCs joined by at least one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condensation {
    successors: Vec<BTreeSet<SccId>>,
}

impl Condensation {
    /// Contracts every SCC of `graph` to a single vertex.
    pub fn build(graph: &FlowsheetGraph, sccs: &SccDecomposition) -> Self {
        let mut successors = vec![BTreeSet::new(); sccs.len()];
        for id in graph.edge_ids() {
            let edge = graph.edge(id);
            let from = sccs.scc_of(edge.source);
            let to = sccs.scc_of(edge.target);
            if from != to {
                successors[from.index()].insert(to);
            }
        }
        Condensation { successors }
    }

    /// Successor components of `id`.
    pub fn successors(&self, id: SccId) -> &BTreeSet<SccId> {
        &self.successors[id.index()]
    }

    /// Orders the components with Kahn's algorithm.
    ///
    /// Among components that are ready at the same time, the one holding the
    /// earliest-declared node goes first, so independent branches run in the
    /// order the flowsheet lists them.
    pub fn topological_order(&self, sccs: &SccDecomposition) -> Result<Vec<SccId>, PlanningError> {
        let total = self.successors.len();
        let mut in_degree = vec![0usize; total];
        for targets in &self.successors {
            for to in targets {
                in_degree[to.index()] += 1;
            }
        }

        let anchor = |id: SccId| sccs.members(id).first().copied();
        let mut ready: BinaryHeap<Reverse<_>> = (0..total)
            .filter(|&i| in_degree[i] == 0)
            .map(|i| Reverse((anchor(SccId(i as u32)), SccId(i as u32))))
            .collect();

        let mut order = Vec::with_capacity(total);
        while let Some(Reverse((_, id))) = ready.pop() {
            order.push(id);
            for &to in &self.successors[id.index()] {
                in_degree[to.index()] -= 1;
                if in_degree[to.index()] == 0 {
                    ready.push(Reverse((anchor(to), to)));
                }
            }
        }

        if order.len() != total {
            return Err(PlanningError::CondensationCycle {
                ordered: order.len(),
                total,
            });
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scc::decompose_graph;
    use flowsheet_core::FlowsheetSpec;
    use serde_json::json;

    #[test]
    fn recycle_loop_contracts_to_one_vertex() {
        let spec = FlowsheetSpec::default()
            .node("influent", "influent_static", json!({}))
            .node("combiner", "combiner", json!({}))
            .node("reactor", "gain", json!({}))
            .node("splitter", "splitter", json!({}))
            .node("effluent", "effluent", json!({}))
            .edge("e1", ("influent", "out_main"), ("combiner", "in_fresh"))
            .edge("e2", ("combiner", "out_combined"), ("reactor", "in_main"))
            .edge("e3", ("reactor", "out_main"), ("splitter", "in_main"))
            .edge("e4", ("splitter", "out_recycle_to_combiner"), ("combiner", "in_recycle"))
            .edge("e5", ("splitter", "out_to_settler"), ("effluent", "in_main"));
        let graph = FlowsheetGraph::build(&spec).unwrap();
        let sccs = decompose_graph(&graph);
        assert_eq!(sccs.len(), 3);

        let condensation = Condensation::build(&graph, &sccs);
        let order = condensation.topological_order(&sccs).unwrap();
        let names: Vec<Vec<&str>> = order
            .iter()
            .map(|&id| sccs.members(id).iter().map(|&n| graph.node_name(n)).collect())
            .collect();
        assert_eq!(
            names,
            vec![
                vec!["influent"],
                vec!["combiner", "reactor", "splitter"],
                vec!["effluent"],
            ]
        );
    }

    #[test]
    fn independent_branches_follow_declaration_order() {
        let spec = FlowsheetSpec::default()
            .node("b", "gain", json!({}))
            .node("a", "gain", json!({}))
            .node("c", "gain", json!({}));
        let graph = FlowsheetGraph::build(&spec).unwrap();
        let sccs = decompose_graph(&graph);
        let order = Condensation::build(&graph, &sccs)
            .topological_order(&sccs)
            .unwrap();
        let names: Vec<&str> = order
            .iter()
            .map(|&id| graph.node_name(sccs.members(id)[0]))
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn cyclic_condensation_is_an_internal_error() {
        // Two singleton components with a hand-built arc in each direction,
        // as a broken decomposition would produce.
        let sccs = crate::scc::decompose(&[vec![], vec![]]);
        let broken = Condensation {
            successors: vec![BTreeSet::from([SccId(1)]), BTreeSet::from([SccId(0)])],
        };
        match broken.topological_order(&sccs) {
            Err(PlanningError::CondensationCycle { ordered, total }) => {
                assert_eq!(ordered, 0);
                assert_eq!(total, 2);
            }
            other => panic!("expected CondensationCycle, got {:?}", other),
        }
    }
}
