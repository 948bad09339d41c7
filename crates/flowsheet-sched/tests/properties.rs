//! Structural properties of the execution plan.

use std::collections::{BTreeSet, HashSet};

use petgraph::algo::{tarjan_scc, toposort};
use proptest::prelude::*;
use serde_json::json;

use flowsheet_core::{EdgeId, FlowsheetGraph, FlowsheetSpec, NodeId};
use flowsheet_sched::{decompose_graph, plan_graph, Schedule, Stage};

fn build(spec: &FlowsheetSpec) -> (FlowsheetGraph, Schedule) {
    let graph = FlowsheetGraph::build(spec).unwrap();
    let schedule = plan_graph(&graph).unwrap();
    (graph, schedule)
}

/// Flowsheet with nodes `n0..n{n}` and one edge per pair, each into its own port.
fn from_pairs(n: usize, pairs: &[(usize, usize)]) -> FlowsheetSpec {
    let mut spec = FlowsheetSpec::default();
    for i in 0..n {
        spec = spec.node(&format!("n{}", i), "gain", json!({}));
    }
    for (k, &(u, v)) in pairs.iter().enumerate() {
        spec = spec.edge(
            &format!("e{}", k),
            (&format!("n{}", u), "out"),
            (&format!("n{}", v), &format!("in_{}", k)),
        );
    }
    spec
}

fn flattened(schedule: &Schedule) -> Vec<NodeId> {
    schedule
        .stages()
        .iter()
        .flat_map(|s| s.execution_order().iter().copied())
        .collect()
}

fn assert_complete(graph: &FlowsheetGraph, schedule: &Schedule) {
    let order = flattened(schedule);
    assert_eq!(order.len(), graph.node_count());
    let unique: HashSet<NodeId> = order.iter().copied().collect();
    assert_eq!(unique.len(), graph.node_count());
}

fn assert_ordered(graph: &FlowsheetGraph, schedule: &Schedule) {
    let torn: HashSet<EdgeId> = schedule.tear_edges().collect();
    let slot = |n: NodeId| {
        let stage = schedule.stage_of(n);
        let position = schedule.stages()[stage]
            .execution_order()
            .iter()
            .position(|&m| m == n)
            .unwrap();
        (stage, position)
    };
    for e in graph.edge_ids() {
        if torn.contains(&e) {
            continue;
        }
        let edge = graph.edge(e);
        let (su, pu) = slot(edge.source);
        let (sv, pv) = slot(edge.target);
        assert!(
            su < sv || (su == sv && schedule.stages()[su].is_loop() && pu < pv),
            "edge {} runs backwards",
            graph.edge_name(e)
        );
    }
}

fn assert_reduced_acyclic(graph: &FlowsheetGraph, schedule: &Schedule) {
    let torn: HashSet<EdgeId> = schedule.tear_edges().collect();
    let reduced = graph
        .to_digraph()
        .filter_map(|_, n| Some(*n), |_, e| (!torn.contains(e)).then_some(*e));
    assert!(toposort(&reduced, None).is_ok());
}

#[test]
fn single_cycle_is_isolated_with_one_tear() {
    let spec = FlowsheetSpec::default()
        .node("A", "gain", json!({}))
        .node("B", "gain", json!({}))
        .node("C", "gain", json!({}))
        .edge("ab", ("A", "out"), ("B", "in"))
        .edge("bc", ("B", "out"), ("C", "in"))
        .edge("ca", ("C", "out"), ("A", "in"));
    let (graph, schedule) = build(&spec);

    assert_eq!(schedule.stages().len(), 1);
    match &schedule.stages()[0] {
        Stage::Loop { nodes, tear_edges, .. } => {
            assert_eq!(nodes, &vec![NodeId(0), NodeId(1), NodeId(2)]);
            assert_eq!(tear_edges.len(), 1);
        }
        other => panic!("expected a loop stage, got {:?}", other),
    }
    assert_reduced_acyclic(&graph, &schedule);
}

#[test]
fn feed_forward_chain_takes_the_fast_path() {
    let spec = FlowsheetSpec::default()
        .node("influent", "influent_static", json!({}))
        .node("reactor1", "gain", json!({}))
        .node("reactor2", "gain", json!({}))
        .node("effluent", "effluent", json!({}))
        .edge("e1", ("influent", "out_main"), ("reactor1", "in_main"))
        .edge("e2", ("reactor1", "out_main"), ("reactor2", "in_main"))
        .edge("e3", ("reactor2", "out_main"), ("effluent", "in_main"));
    let (graph, schedule) = build(&spec);

    assert_eq!(schedule.loop_count(), 0);
    assert!(schedule.stages().iter().all(|s| !s.is_loop()));
    let names: Vec<&str> = flattened(&schedule).into_iter().map(|n| graph.node_name(n)).collect();
    assert_eq!(names, vec!["influent", "reactor1", "reactor2", "effluent"]);
}

#[test]
fn declaration_order_wins_over_reverse_listing() {
    // Same chain, nodes declared sink first.
    let spec = FlowsheetSpec::default()
        .node("effluent", "effluent", json!({}))
        .node("reactor", "gain", json!({}))
        .node("influent", "influent_static", json!({}))
        .edge("e1", ("influent", "out_main"), ("reactor", "in_main"))
        .edge("e2", ("reactor", "out_main"), ("effluent", "in_main"));
    let (graph, schedule) = build(&spec);
    let names: Vec<&str> = flattened(&schedule).into_iter().map(|n| graph.node_name(n)).collect();
    assert_eq!(names, vec!["influent", "reactor", "effluent"]);
}

#[test]
fn self_loop_never_lands_in_an_acyclic_stage() {
    let spec = FlowsheetSpec::default()
        .node("feed", "influent_static", json!({}))
        .node("tank", "sum", json!({}))
        .edge("f", ("feed", "out_main"), ("tank", "in_main"))
        .edge("loop", ("tank", "out_main"), ("tank", "in_recycle"));
    let (graph, schedule) = build(&spec);

    let tank = graph.node_id("tank").unwrap();
    let stage = &schedule.stages()[schedule.stage_of(tank)];
    assert!(stage.is_loop());
    assert_eq!(stage.tear_edges(), &[graph.edge_id("loop").unwrap()]);
    assert_eq!(stage.execution_order(), &[tank]);
}

#[test]
fn overlapping_cycles_form_one_loop() {
    // a <-> b, b <-> c, and c -> a: one SCC with several overlapping cycles.
    let spec = from_pairs(4, &[(0, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 3)]);
    let (graph, schedule) = build(&spec);
    assert_eq!(schedule.loop_count(), 1);
    assert_eq!(schedule.stages().len(), 2);
    assert_complete(&graph, &schedule);
    assert_ordered(&graph, &schedule);
    assert_reduced_acyclic(&graph, &schedule);
    assert!(schedule.validate(&graph).is_ok());
}

#[test]
fn rebuilds_from_identical_input_are_identical() {
    let pairs = [(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 3), (4, 4), (5, 1)];
    let (_, first) = build(&from_pairs(6, &pairs));
    let (_, second) = build(&from_pairs(6, &pairs));
    assert_eq!(first, second);
}

fn arbitrary_flowsheet() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..14).prop_flat_map(|n| {
        let pairs = prop::collection::vec((0..n, 0..n), 0..(3 * n));
        (Just(n), pairs)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn plan_is_complete_and_ordered((n, pairs) in arbitrary_flowsheet()) {
        let (graph, schedule) = build(&from_pairs(n, &pairs));
        assert_complete(&graph, &schedule);
        assert_ordered(&graph, &schedule);
        assert_reduced_acyclic(&graph, &schedule);
        prop_assert!(schedule.validate(&graph).is_ok());
    }

    #[test]
    fn planning_is_deterministic((n, pairs) in arbitrary_flowsheet()) {
        let (_, first) = build(&from_pairs(n, &pairs));
        let (_, second) = build(&from_pairs(n, &pairs));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn components_agree_with_petgraph((n, pairs) in arbitrary_flowsheet()) {
        let graph = FlowsheetGraph::build(&from_pairs(n, &pairs)).unwrap();
        let ours: BTreeSet<Vec<usize>> = decompose_graph(&graph)
            .components()
            .iter()
            .map(|c| c.iter().map(|n| n.index()).collect())
            .collect();
        let theirs: BTreeSet<Vec<usize>> = tarjan_scc(&graph.to_digraph())
            .into_iter()
            .map(|c| {
                let mut members: Vec<usize> = c.into_iter().map(|i| i.index()).collect();
                members.sort();
                members
            })
            .collect();
        prop_assert_eq!(ours, theirs);
    }

    #[test]
    fn loop_stages_match_cyclic_components((n, pairs) in arbitrary_flowsheet()) {
        let (graph, schedule) = build(&from_pairs(n, &pairs));
        for stage in schedule.stages() {
            match stage {
                Stage::Acyclic { node, .. } => {
                    prop_assert!(!graph.has_self_loop(*node));
                }
                Stage::Loop { nodes, tear_edges, .. } => {
                    prop_assert!(!tear_edges.is_empty());
                    prop_assert!(nodes.len() > 1 || graph.has_self_loop(nodes[0]));
                    for &e in tear_edges {
                        let edge = graph.edge(e);
                        prop_assert!(nodes.contains(&edge.source) && nodes.contains(&edge.target));
                    }
                }
            }
        }
    }
}
