//! Randomized planner checks.
//!
//! Generates random directed multigraphs (self-loops and parallel edges
//! included), plans each one and re-validates the resulting schedule. This
//! is how the bounded tear-retry policy gets exercised on overlapping cycles
//! without assuming it always suffices.
//!
//! Reproducibility: the same `random_seed` generates the same graphs and
//! therefore the same result.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use flowsheet_core::{FlowsheetGraph, FlowsheetSpec};

use crate::plan::plan_graph;
use crate::schedule::Stage;

/// Configuration for a fuzz run.
#[derive(Debug, Clone)]
pub struct FuzzConfig {
    /// Number of random graphs to plan.
    pub iterations: u32,
    /// Upper bound on nodes per graph (at least 1 node is always generated).
    pub max_nodes: usize,
    /// Probability of an edge for each ordered node pair, in [0, 1].
    pub edge_density: f64,
    pub random_seed: u64,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        FuzzConfig {
            iterations: 200,
            max_nodes: 12,
            edge_density: 0.2,
            random_seed: 0,
        }
    }
}

/// Result of a fuzz run.
#[derive(Debug, Clone)]
pub struct FuzzResult {
    pub total_run: u32,
    pub passed: u32,
    pub failures: Vec<FuzzFailure>,
    /// The random seed used (for reproducibility).
    pub random_seed: u64,
}

/// A graph the planner mishandled.
#[derive(Debug, Clone)]
pub struct FuzzFailure {
    pub node_count: usize,
    /// `(source, target)` node indices, in declaration order.
    pub edges: Vec<(usize, usize)>,
    pub reason: String,
}

/// Generates a random flowsheet with `1..=max_nodes` nodes named `n0, n1, ...`.
///
/// Every ordered pair, self pairs included, gets an edge with probability
/// `edge_density`, and a parallel second edge with half that probability.
/// Every edge feeds its own target port, so the result always builds.
pub fn random_flowsheet(rng: &mut ChaCha8Rng, max_nodes: usize, edge_density: f64) -> FlowsheetSpec {
    let density = edge_density.clamp(0.0, 1.0);
    let n = rng.gen_range(1..=max_nodes.max(1));
    let mut spec = FlowsheetSpec::default();
    for i in 0..n {
        spec = spec.node(&format!("n{}", i), "gain", json!({}));
    }

    let mut next_edge = 0usize;
    for u in 0..n {
        for v in 0..n {
            let copies = usize::from(rng.gen_bool(density)) + usize::from(rng.gen_bool(density / 2.0));
            for _ in 0..copies {
                let source = format!("n{}", u);
                let target = format!("n{}", v);
                let port = format!("in_{}", next_edge);
                spec = spec.edge(&format!("e{}", next_edge), (&source, "out"), (&target, &port));
                next_edge += 1;
            }
        }
    }
    spec
}

/// Plans `config.iterations` random graphs and validates every schedule.
pub fn fuzz_planner(config: &FuzzConfig) -> FuzzResult {
    let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
    let mut passed = 0;
    let mut failures = Vec::new();

    for _ in 0..config.iterations {
        let spec = random_flowsheet(&mut rng, config.max_nodes, config.edge_density);
        match check(&spec) {
            Ok(()) => passed += 1,
            Err(reason) => failures.push(FuzzFailure {
                node_count: spec.nodes.len(),
                edges: edge_list(&spec),
                reason,
            }),
        }
    }

    FuzzResult {
        total_run: config.iterations,
        passed,
        failures,
        random_seed: config.random_seed,
    }
}

fn check(spec: &FlowsheetSpec) -> Result<(), String> {
    let graph = FlowsheetGraph::build(spec).map_err(|e| format!("build: {}", e))?;
    let schedule = plan_graph(&graph).map_err(|e| format!("plan: {}", e))?;
    schedule.validate(&graph).map_err(|e| e.to_string())?;

    for stage in schedule.stages() {
        match stage {
            Stage::Acyclic { node, .. } if graph.has_self_loop(*node) => {
                return Err(format!("self-loop on '{}' in an acyclic stage", graph.node_name(*node)));
            }
            Stage::Loop { tear_edges, .. } if tear_edges.is_empty() => {
                return Err(format!("loop stage {} has no tear edges", stage.component()));
            }
            _ => {}
        }
    }
    Ok(())
}

fn edge_list(spec: &FlowsheetSpec) -> Vec<(usize, usize)> {
    let index = |name: &str| spec.nodes.iter().position(|n| n.id == name).unwrap_or(usize::MAX);
    spec.edges
        .iter()
        .map(|e| (index(&e.source_node_id), index(&e.target_node_id)))
        .collect()
}
