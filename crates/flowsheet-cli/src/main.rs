//! Flowsheet scheduler CLI.
//!
//! Provides the `flowsheet` binary with two subcommands over a JSON flowsheet
//! document: `plan` prints the execution plan, `run` steps the flowsheet
//! with the built-in components and prints the final edge values.
//!
//! Both print JSON to stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::info;

use flowsheet_core::{ConfigError, FlowsheetGraph, FlowsheetSpec, SolverSettings};
use flowsheet_sched::{plan_graph, Engine, EngineError, NodeRegistry};

/// Flowsheet execution scheduler.
#[derive(Parser)]
#[command(name = "flowsheet", about = "Plan and run process flowsheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the execution plan of a flowsheet.
    Plan {
        /// Path to the flowsheet JSON document.
        #[arg(short, long)]
        flowsheet: PathBuf,
    },
    /// Simulate a flowsheet on a fixed time grid.
    Run {
        /// Path to the flowsheet JSON document.
        #[arg(short, long)]
        flowsheet: PathBuf,

        /// Time step length.
        #[arg(short, long, default_value_t = 1.0)]
        timestep: f64,

        /// End of the simulated interval; a step lands on it when it is a
        /// multiple of the time step.
        #[arg(short, long)]
        endtime: f64,

        #[command(flatten)]
        solver: SolverArgs,
    },
}

/// Solver overrides. Unset values fall back to the flowsheet's `solver`
/// block, then to the defaults.
#[derive(clap::Args)]
struct SolverArgs {
    /// Convergence tolerance for recycle loops.
    #[arg(long, env = "FLOWSHEET_TOLERANCE")]
    tolerance: Option<f64>,

    /// Sweep cap per loop stage per step.
    #[arg(long, env = "FLOWSHEET_MAX_ITER")]
    max_iter: Option<usize>,

    /// Under-relaxation factor in (0, 1].
    #[arg(long, env = "FLOWSHEET_RELAX")]
    relax: Option<f64>,
}

impl SolverArgs {
    fn apply(&self, base: SolverSettings) -> SolverSettings {
        SolverSettings {
            tolerance: self.tolerance.unwrap_or(base.tolerance),
            max_iter: self.max_iter.unwrap_or(base.max_iter),
            relax: self.relax.unwrap_or(base.relax),
            ..base
        }
    }
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Plan { flowsheet } => run_plan(&flowsheet),
        Commands::Run {
            flowsheet,
            timestep,
            endtime,
            solver,
        } => run_simulation(&flowsheet, timestep, endtime, &solver),
    };
    process::exit(exit_code);
}

/// Execute the plan subcommand.
///
/// Returns exit code: 0 = success, 1 = planning error,
/// 2 = invalid flowsheet, 3 = I/O error.
fn run_plan(path: &Path) -> i32 {
    let spec = match load(path) {
        Ok(spec) => spec,
        Err(code) => return code,
    };
    let graph = match FlowsheetGraph::build(&spec) {
        Ok(graph) => graph,
        Err(e) => return report_config_error(&e),
    };
    match plan_graph(&graph) {
        Ok(schedule) => {
            print_json(&schedule.report(&graph));
            0
        }
        Err(e) => {
            eprintln!("Planning error: {}", e);
            1
        }
    }
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = success (converged or not), 1 = planning or
/// execution error, 2 = invalid flowsheet or settings, 3 = I/O error.
fn run_simulation(path: &Path, timestep: f64, endtime: f64, solver: &SolverArgs) -> i32 {
    let spec = match load(path) {
        Ok(spec) => spec,
        Err(code) => return code,
    };
    let settings = solver.apply(spec.solver.unwrap_or_default());
    let registry = NodeRegistry::with_builtins();

    let mut engine = match Engine::new(&spec, &registry, settings) {
        Ok(engine) => engine,
        Err(EngineError::Config(e)) => return report_config_error(&e),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let reports = match engine.simulate(timestep, endtime) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Simulation error: {}", e);
            return 1;
        }
    };

    let mut edges = Map::new();
    for id in engine.graph().edge_ids() {
        let name = engine.graph().edge_name(id);
        let value = match engine.edge_value(name) {
            Some(stream) => json!(stream),
            None => Value::Null,
        };
        edges.insert(name.to_string(), value);
    }
    print_json(&json!({
        "steps": reports.len(),
        "unconverged_steps": reports.iter().filter(|r| !r.converged()).count(),
        "max_sweeps": reports.iter().map(|r| r.total_sweeps()).max().unwrap_or(0),
        "edges": edges,
    }));
    0
}

fn load(path: &Path) -> Result<FlowsheetSpec, i32> {
    let spec = FlowsheetSpec::from_json_file(path).map_err(|e| match e {
        ConfigError::Io(io) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), io);
            3
        }
        other => report_config_error(&other),
    })?;
    info!(
        path = %path.display(),
        nodes = spec.nodes.len(),
        edges = spec.edges.len(),
        "loaded flowsheet"
    );
    Ok(spec)
}

fn report_config_error(e: &ConfigError) -> i32 {
    eprintln!("Invalid flowsheet: {}", e);
    2
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}
