use proptest::prelude::*;
use serde_json::json;

use flowsheet_core::{ConfigError, EdgeId, FlowsheetGraph, FlowsheetSpec, NodeId};

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

fn arbitrary_pairs() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..16).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..(3 * n))))
}

proptest! {
    #[test]
    fn indices_follow_declaration_order((n, pairs) in arbitrary_pairs()) {
        let graph = FlowsheetGraph::build(&from_pairs(n, &pairs)).unwrap();
        prop_assert_eq!(graph.node_count(), n);
        prop_assert_eq!(graph.edge_count(), pairs.len());
        for (k, &(u, v)) in pairs.iter().enumerate() {
            let id = graph.edge_id(&format!("e{}", k)).unwrap();
            prop_assert_eq!(id, EdgeId(k as u32));
            prop_assert_eq!(graph.edge(id).source, NodeId(u as u32));
            prop_assert_eq!(graph.edge(id).target, NodeId(v as u32));
        }
    }

    #[test]
    fn adjacency_views_agree((n, pairs) in arbitrary_pairs()) {
        let graph = FlowsheetGraph::build(&from_pairs(n, &pairs)).unwrap();
        for node in graph.node_ids() {
            let via_edges: Vec<NodeId> = graph
                .outgoing(node)
                .iter()
                .map(|&e| graph.edge(e).target)
                .collect();
            prop_assert_eq!(graph.successors(node), via_edges.as_slice());
            prop_assert_eq!(
                graph.has_self_loop(node),
                via_edges.contains(&node)
            );
            for &e in graph.incoming(node) {
                prop_assert_eq!(graph.edge(e).target, node);
            }
        }
        for e in graph.edge_ids() {
            let edge = graph.edge(e);
            prop_assert!(graph.edges_between(edge.source, edge.target).contains(&e));
        }
        let digraph = graph.to_digraph();
        prop_assert_eq!(digraph.node_count(), n);
        prop_assert_eq!(digraph.edge_count(), pairs.len());
    }
}

#[test]
fn shared_input_port_is_rejected() {
    let spec = FlowsheetSpec::default()
        .node("a", "gain", json!({}))
        .node("b", "gain", json!({}))
        .node("mixer", "combiner", json!({}))
        .edge("first", ("a", "out_main"), ("mixer", "in_main"))
        .edge("second", ("b", "out_main"), ("mixer", "in_main"));
    match FlowsheetGraph::build(&spec) {
        Err(ConfigError::DuplicateInputPort { node, port, first, second }) => {
            assert_eq!(node, "mixer");
            assert_eq!(port, "in_main");
            assert_eq!(first, "first");
            assert_eq!(second, "second");
        }
        other => panic!("expected DuplicateInputPort, got {:?}", other.map(|g| g.node_count())),
    }
}

#[test]
fn fan_out_from_one_port_is_allowed() {
    let spec = FlowsheetSpec::default()
        .node("src", "influent_static", json!({}))
        .node("a", "gain", json!({}))
        .node("b", "gain", json!({}))
        .edge("sa", ("src", "out_main"), ("a", "in_main"))
        .edge("sb", ("src", "out_main"), ("b", "in_main"));
    let graph = FlowsheetGraph::build(&spec).unwrap();
    assert_eq!(graph.outgoing(NodeId(0)).len(), 2);
}

#[test]
fn parses_a_document_from_disk() {
    let dir = std::env::temp_dir().join(format!("flowsheet-core-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("plant.json");
    std::fs::write(
        &path,
        r#"{"nodes": [{"id": "a", "component_type_id": "gain"}], "edges": []}"#,
    )
    .unwrap();
    let spec = FlowsheetSpec::from_json_file(&path).unwrap();
    assert_eq!(spec.nodes[0].id, "a");
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(matches!(
        FlowsheetSpec::from_json_file(dir.join("missing.json")),
        Err(ConfigError::Io(_))
    ));
}
