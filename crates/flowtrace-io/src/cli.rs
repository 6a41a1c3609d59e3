use crate::{
    as_percent, read_flow_matrix, read_observations, write_edge_list, IndexBase, Report, RunConfig,
};
use anyhow::{anyhow, Context};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use flowtrace_core::{sparsify, trace_source, SolveMethod, TraceOutcome};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "flowtrace")]
#[command(about = "Locate the most likely source of a contamination event in a layered flow network")]
#[command(long_about = "Back-traces observed contamination reports through a layered network modelled as an absorbing Markov chain")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the source distribution for a set of observations
    Trace(TraceArgs),

    /// Write the nonzero entries of a dense flow matrix as an edge list
    Sparsify {
        /// Dense flow matrix (headerless CSV)
        #[arg(long)]
        flows: PathBuf,

        /// Output edge list CSV
        #[arg(long)]
        out: PathBuf,

        /// Numbering of node ids in the output
        #[arg(long, value_enum, default_value = "one")]
        index_base: IndexBase,
    },
}

#[derive(Args, Debug)]
pub struct TraceArgs {
    /// JSON run configuration; flags below override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dense flow matrix (headerless CSV)
    #[arg(long)]
    pub flows: Option<PathBuf>,

    /// Observed contamination reports (headerless CSV, one row)
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Node count of each layer, first to last
    #[arg(long, value_delimiter = ',')]
    pub layers: Option<Vec<usize>>,

    /// Numbering of node ids in input and output
    #[arg(long, value_enum)]
    pub index_base: Option<IndexBase>,

    /// Linear solve strategy
    #[arg(long, value_enum)]
    pub method: Option<MethodType>,

    /// Write a JSON report here
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum MethodType {
    #[value(name = "lu")]
    Lu,
    #[value(name = "inverse")]
    Inverse,
    #[value(name = "layered-sweep")]
    LayeredSweep,
}

impl From<MethodType> for SolveMethod {
    fn from(method: MethodType) -> Self {
        match method {
            MethodType::Lu => SolveMethod::Lu,
            MethodType::Inverse => SolveMethod::Inverse,
            MethodType::LayeredSweep => SolveMethod::LayeredSweep,
        }
    }
}

impl TraceArgs {
    /// Merge the optional config file with command line overrides
    pub fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match self.config {
            Some(path) => {
                let mut config = RunConfig::load_from_file(&path)?;
                if let Some(flows) = self.flows {
                    config.flows = flows;
                }
                if let Some(observations) = self.observations {
                    config.observations = observations;
                }
                if let Some(layers) = self.layers {
                    config.layer_sizes = layers;
                }
                config
            }
            None => {
                let missing = |flag: &str| anyhow!("--{} is required without --config", flag);
                RunConfig::new(
                    self.layers.ok_or_else(|| missing("layers"))?,
                    self.flows.ok_or_else(|| missing("flows"))?,
                    self.observations.ok_or_else(|| missing("observations"))?,
                )
            }
        };

        if let Some(base) = self.index_base {
            config.index_base = base;
        }
        if let Some(method) = self.method {
            config.solver.method = method.into();
        }
        if self.report.is_some() {
            config.report = self.report;
        }
        Ok(config)
    }
}

/// Load inputs and run the trace described by `config`
pub fn run_trace(config: &RunConfig) -> anyhow::Result<TraceOutcome> {
    let layers = config.layer_index().context("layer configuration")?;
    let flows = read_flow_matrix(&config.flows)?;
    let observations = read_observations(&config.observations, config.index_base)?;
    info!(
        nodes = flows.node_count(),
        edges = flows.nonzero_count(),
        observations = observations.len(),
        "loaded network"
    );

    let outcome = trace_source(&flows, &layers, &observations, &config.solver)?;
    Ok(outcome)
}

pub fn run_trace_command(args: TraceArgs) -> anyhow::Result<()> {
    let config = args.into_config()?;
    let base = config.index_base;
    let external = |ids: &[usize]| -> Vec<usize> { ids.iter().map(|&n| base.to_external(n)).collect() };

    let outcome = run_trace(&config)?;

    println!("IDs of contaminated nodes: {:?}", external(outcome.observations().as_slice()));
    println!("Total number of nodes: {}", config.layer_sizes.iter().sum::<usize>());
    println!("Found all feasible nodes: {:?}", external(outcome.candidates().as_slice()));
    if let Some((node, probability)) = outcome.most_likely() {
        println!(
            "Most probable source is node {} with probability of {:.2}%",
            base.to_external(node),
            as_percent(probability)
        );
    }

    if let Some(path) = &config.report {
        Report::new(&config, &outcome).save_to_file(path)?;
        println!("Wrote report to {}", path.display());
    }

    Ok(())
}

pub fn run_sparsify_command(flows: PathBuf, out: PathBuf, index_base: IndexBase) -> anyhow::Result<()> {
    let matrix = read_flow_matrix(&flows)?;
    let edges = sparsify(&matrix);
    write_edge_list(&edges, index_base, &out)?;

    println!("Wrote {} edges of a {} node network to {}", edges.len(), matrix.node_count(), out.display());
    Ok(())
}
