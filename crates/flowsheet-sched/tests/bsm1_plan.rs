//! Plan of a BSM1-shaped activated sludge plant: five reactors in series,
//! an internal recycle from the last reactor and a sludge recycle from the
//! settler, both returning to the inlet mixer.

use serde_json::json;

use flowsheet_core::{FlowsheetGraph, FlowsheetSpec};
use flowsheet_sched::plan_graph;

fn bsm1() -> FlowsheetSpec {
    let mut spec = FlowsheetSpec::default()
        .node("influent", "influent_static", json!({}))
        .node("combiner", "combiner", json!({}));
    for i in 1..=5 {
        spec = spec.node(&format!("reactor{}", i), "reactor", json!({}));
    }
    spec = spec
        .node("splitter", "splitter", json!({"qintr": 55338}))
        .node("settler", "settler", json!({}))
        .node("effluent", "effluent", json!({}))
        .edge("e_inf", ("influent", "out_main"), ("combiner", "in_fresh"))
        .edge("e_c1", ("combiner", "out_combined"), ("reactor1", "in_main"));
    for i in 1..5 {
        spec = spec.edge(
            &format!("e_{}{}", i, i + 1),
            (&format!("reactor{}", i), "out_main"),
            (&format!("reactor{}", i + 1), "in_main"),
        );
    }
    spec.edge("e_5s", ("reactor5", "out_main"), ("splitter", "in_main"))
        .edge("e_int", ("splitter", "out_recycle_to_combiner"), ("combiner", "in_internal_recycle"))
        .edge("e_set", ("splitter", "out_to_settler"), ("settler", "in_main"))
        .edge("e_ras", ("settler", "out_sludge_recycle"), ("combiner", "in_sludge_recycle"))
        .edge("e_eff", ("settler", "out_effluent"), ("effluent", "in_main"))
}

#[test]
fn bsm1_schedule_report() {
    let graph = FlowsheetGraph::build(&bsm1()).unwrap();
    let schedule = plan_graph(&graph).unwrap();
    schedule.validate(&graph).unwrap();

    insta::assert_json_snapshot!(schedule.report(&graph), @r###"
    {
      "component_count": 3,
      "component_order": [
        2,
        1,
        0
      ],
      "stages": [
        {
          "kind": "acyclic",
          "component": 2,
          "node": "influent"
        },
        {
          "kind": "loop",
          "component": 1,
          "nodes": [
            "combiner",
            "reactor1",
            "reactor2",
            "reactor3",
            "reactor4",
            "reactor5",
            "splitter",
            "settler"
          ],
          "internal_order": [
            "combiner",
            "reactor1",
            "reactor2",
            "reactor3",
            "reactor4",
            "reactor5",
            "splitter",
            "settler"
          ],
          "tear_edges": [
            "e_int",
            "e_ras"
          ]
        },
        {
          "kind": "acyclic",
          "component": 0,
          "node": "effluent"
        }
      ],
      "node_to_component": {
        "influent": 2,
        "combiner": 1,
        "reactor1": 1,
        "reactor2": 1,
        "reactor3": 1,
        "reactor4": 1,
        "reactor5": 1,
        "splitter": 1,
        "settler": 1,
        "effluent": 0
      }
    }
    "###);
}

#[test]
fn recycles_are_the_torn_edges() {
    let graph = FlowsheetGraph::build(&bsm1()).unwrap();
    let schedule = plan_graph(&graph).unwrap();
    let mut torn: Vec<&str> = schedule.tear_edges().map(|e| graph.edge_name(e)).collect();
    torn.sort();
    assert_eq!(torn, vec!["e_int", "e_ras"]);

    // Both recycles return into the mixer, which runs first in its loop.
    let combiner = graph.node_id("combiner").unwrap();
    let stage = &schedule.stages()[schedule.stage_of(combiner)];
    assert_eq!(stage.execution_order()[0], combiner);
}
