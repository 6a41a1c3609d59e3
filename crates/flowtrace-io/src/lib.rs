use anyhow::{anyhow, bail, Context};
use flowtrace_core::{FlowEdge, FlowMatrix, NodeId, SolveMethod, TraceOutcome, F};
use nalgebra::DMatrix;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

pub mod cli;
pub mod config;

pub use cli::*;
pub use config::{IndexBase, RunConfig};

/// Read a headerless comma-separated table.
///
/// Column types are inferred from every row: in a layered flow matrix the
/// absorbing columns are zero until the last transient rows.
pub fn read_table(path: &Path) -> anyhow::Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("opening {}", path.display()))?
        .finish()
        .with_context(|| format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), rows = df.height(), cols = df.width(), "read table");
    Ok(df)
}

/// Dense flow matrix, rows = origin, columns = destination
pub fn read_flow_matrix(path: &Path) -> anyhow::Result<FlowMatrix> {
    let df = read_table(path)?;
    let (rows, cols) = df.shape();
    let mut weights = DMatrix::zeros(rows, cols);

    for (col, series) in df.get_columns().iter().enumerate() {
        let values = series.cast(&DataType::Float64)?;
        for (row, value) in values.f64()?.into_iter().enumerate() {
            weights[(row, col)] = value.ok_or_else(|| {
                anyhow!("missing flow weight at row {}, column {} of {}", row + 1, col + 1, path.display())
            })?;
        }
    }

    FlowMatrix::new(weights).with_context(|| format!("flow matrix in {}", path.display()))
}

/// Observed node ids from the first row, converted to zero-based ids
pub fn read_observations(path: &Path, base: IndexBase) -> anyhow::Result<Vec<NodeId>> {
    let df = read_table(path)?;
    if df.height() == 0 {
        bail!("no observations in {}", path.display());
    }

    let mut ids = Vec::with_capacity(df.width());
    for series in df.get_columns() {
        let values = series.cast(&DataType::Int64)?;
        if let Some(raw) = values.i64()?.get(0) {
            let id = base
                .to_internal(raw)
                .with_context(|| format!("observation in {}", path.display()))?;
            ids.push(id);
        }
    }

    if ids.is_empty() {
        bail!("no observations in {}", path.display());
    }
    Ok(ids)
}

/// Write an `origin,destination,weight` edge list
pub fn write_edge_list(edges: &[FlowEdge], base: IndexBase, path: &Path) -> anyhow::Result<()> {
    let origins: Vec<i64> = edges.iter().map(|e| base.to_external(e.origin) as i64).collect();
    let destinations: Vec<i64> =
        edges.iter().map(|e| base.to_external(e.destination) as i64).collect();
    let weights: Vec<f64> = edges.iter().map(|e| e.weight).collect();

    let mut df = DataFrame::new(vec![
        Series::new("origin", origins),
        Series::new("destination", destinations),
        Series::new("weight", weights),
    ])?;

    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

/// Most probable source in external numbering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceEstimate {
    pub node: NodeId,
    pub probability: F,
    pub percent: F, // rounded to two decimals
}

/// Persisted summary of one trace run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_id: String,
    pub timestamp: String,
    pub index_base: IndexBase,
    pub layer_sizes: Vec<usize>,
    pub solve_method: SolveMethod,
    pub observations: Vec<NodeId>,
    pub candidates: Vec<NodeId>,
    pub probabilities: Vec<F>,
    pub most_likely: Option<SourceEstimate>,
}

impl Report {
    pub fn new(config: &RunConfig, outcome: &TraceOutcome) -> Self {
        let base = config.index_base;
        let external = |ids: &[NodeId]| -> Vec<NodeId> {
            ids.iter().map(|&n| base.to_external(n)).collect()
        };

        Self {
            run_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            index_base: base,
            layer_sizes: config.layer_sizes.clone(),
            solve_method: config.solver.method,
            observations: external(outcome.observations().as_slice()),
            candidates: external(outcome.candidates().as_slice()),
            probabilities: outcome.distribution.pmf().to_vec(),
            most_likely: outcome.most_likely().map(|(node, probability)| SourceEstimate {
                node: base.to_external(node),
                probability,
                percent: as_percent(probability),
            }),
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading report {}", path.display()))?;
        let report = serde_json::from_str(&json)?;
        Ok(report)
    }
}

/// Probability as a percentage rounded to two decimals
pub fn as_percent(probability: F) -> F {
    (probability * 100.0 * 100.0).round() / 100.0
}
