//! edgeplan — trace-driven deployment-plan optimization.
//!
//! Assembles the library crates: loads the recorded traces, the
//! processing-time and resource tables, and an optional dependency
//! heatmap; runs one of the optimizers; writes the plan artifact and the
//! per-iteration progress log.
//!
//! # Usage
//!
//! ```text
//! edgeplan optimize --traces app.json \
//!     --node-resources resources_nodes.json \
//!     --service-resources resources_services.json \
//!     --edge-times processing_time_edge.json \
//!     --cloud-times processing_time_cloud.json \
//!     --cloud-node asus --edge-only frontend \
//!     --plan-out plan.json --progress-out progress.csv
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use edgeplan_fitness::Evaluator;
use edgeplan_model::ClusterModel;
use edgeplan_search::{DpsoOptimizer, Driver, ProgressLog, RunOutcome, SearchConfig};
use edgeplan_trace::{
    Heatmap, dep_ic_heatmap, load_processing_times, load_resource_table, load_traces,
};

#[derive(Parser)]
#[command(name = "edgeplan", about = "Trace-driven deployment-plan optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the concurrent PSO+GWO scheduler.
    Optimize {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Run the standalone discretized-PSO baseline.
    Dpso {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Compute a dependency heatmap from recorded traces.
    Heatmap {
        /// Recorded trace set (JSON).
        #[arg(long)]
        traces: PathBuf,
        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
        /// Weight by raw call counts instead of invocation-chain strength.
        #[arg(long)]
        call_counts: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Recorded trace set (JSON).
    #[arg(long)]
    traces: PathBuf,

    /// Node resource table: `node → {cpu, memory}`.
    #[arg(long)]
    node_resources: PathBuf,

    /// Service resource table: `service → {cpu, memory}`.
    #[arg(long)]
    service_resources: PathBuf,

    /// Edge processing times: `service → operation → µs`.
    #[arg(long)]
    edge_times: PathBuf,

    /// Cloud processing times: `service → operation → µs`.
    #[arg(long)]
    cloud_times: PathBuf,

    /// Name of the designated cloud node.
    #[arg(long)]
    cloud_node: String,

    /// Services that must stay off the cloud node (repeatable).
    #[arg(long = "edge-only")]
    edge_only: Vec<String>,

    /// Dependency heatmap CSV rewarding co-location.
    #[arg(long)]
    heatmap: Option<PathBuf>,

    /// One-hop network delay in microseconds.
    #[arg(long, default_value_t = 50_000.0)]
    network_delay_us: f64,

    /// Where to write the final plan (`node → service → count` JSON).
    #[arg(long)]
    plan_out: Option<PathBuf>,

    /// Where to append the per-iteration progress CSV.
    #[arg(long)]
    progress_out: Option<PathBuf>,
}

#[derive(Args)]
struct SearchArgs {
    /// Particles per worker population.
    #[arg(long, default_value_t = 300)]
    particles: usize,

    /// Iteration budget.
    #[arg(long, default_value_t = 100)]
    iterations: u64,

    /// RNG seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

impl SearchArgs {
    fn to_config(&self) -> SearchConfig {
        SearchConfig {
            population: self.particles,
            max_iterations: self.iterations,
            seed: self.seed,
            ..SearchConfig::default()
        }
    }
}

fn build_evaluator(inputs: &InputArgs) -> anyhow::Result<Arc<Evaluator>> {
    let traces = load_traces(&inputs.traces)?;
    let node_table = load_resource_table(&inputs.node_resources)?;
    let service_table = load_resource_table(&inputs.service_resources)?;
    let edge_times = load_processing_times(&inputs.edge_times)?;
    let cloud_times = load_processing_times(&inputs.cloud_times)?;

    let model = Arc::new(
        ClusterModel::from_tables(
            &node_table,
            &service_table,
            &inputs.cloud_node,
            &inputs.edge_only,
        )
        .context("building the cluster model")?,
    );
    info!(
        nodes = model.node_count(),
        services = model.service_count(),
        traces = traces.len(),
        "inputs loaded"
    );

    let mut evaluator = Evaluator::new(model, &traces, &edge_times, &cloud_times)
        .with_network_delay(inputs.network_delay_us);
    if let Some(path) = &inputs.heatmap {
        let heatmap = Heatmap::from_csv(path)?;
        info!(pairs = heatmap.len(), "dependency heatmap attached");
        evaluator = evaluator.with_heatmap(&heatmap);
    }
    Ok(Arc::new(evaluator))
}

fn report(outcome: &RunOutcome) {
    info!(
        score = outcome.score,
        iterations = outcome.history.len(),
        "best plan found"
    );
    println!("best predicted latency: {:.1}µs", outcome.score);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,edgeplan=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Optimize { inputs, search } => {
            let evaluator = build_evaluator(&inputs)?;
            let mut driver = Driver::new(evaluator, search.to_config());
            if let Some(path) = &inputs.progress_out {
                driver = driver.with_progress_log(path);
            }
            if let Some(path) = &inputs.plan_out {
                driver = driver.with_artifact(path);
            }
            let outcome = driver.run().await?;
            report(&outcome);
        }
        Command::Dpso { inputs, search } => {
            let evaluator = build_evaluator(&inputs)?;
            let mut dpso = DpsoOptimizer::new(search.to_config(), evaluator.clone())?;
            let mut progress = match &inputs.progress_out {
                Some(path) => Some(ProgressLog::open(path)?),
                None => None,
            };
            let outcome = dpso.run(progress.as_mut())?;
            if let Some(path) = &inputs.plan_out {
                let map = outcome.solution.to_node_map(evaluator.model());
                std::fs::write(path, serde_json::to_string_pretty(&map)?)
                    .with_context(|| format!("writing plan to {}", path.display()))?;
                info!(path = %path.display(), "deployment plan written");
            }
            report(&outcome);
        }
        Command::Heatmap {
            traces,
            out,
            call_counts,
        } => {
            let trace_set = load_traces(&traces)?;
            let heatmap = if call_counts {
                Heatmap::from_call_counts(&edgeplan_trace::count_service_calls(&trace_set))
            } else {
                dep_ic_heatmap(&trace_set)
            };
            heatmap.to_csv(&out)?;
            info!(pairs = heatmap.len(), path = %out.display(), "heatmap written");
        }
    }
    Ok(())
}
