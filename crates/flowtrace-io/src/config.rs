use anyhow::{bail, Context};
use flowtrace_core::{LayerError, LayerIndex, NodeId, SolverConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Numbering used by node ids in input and output files
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexBase {
    Zero,
    #[default]
    One,
}

impl IndexBase {
    pub fn offset(self) -> usize {
        match self {
            IndexBase::Zero => 0,
            IndexBase::One => 1,
        }
    }

    /// Convert an external id to a zero-based node id
    pub fn to_internal(self, raw: i64) -> anyhow::Result<NodeId> {
        let offset = self.offset() as i64;
        if raw < offset {
            bail!("node id {} is below the smallest {:?}-based id {}", raw, self, offset);
        }
        Ok((raw - offset) as NodeId)
    }

    pub fn to_external(self, node: NodeId) -> NodeId {
        node + self.offset()
    }
}

/// Everything one trace run needs; built once and passed down by reference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub layer_sizes: Vec<usize>,
    pub flows: PathBuf,
    pub observations: PathBuf,
    #[serde(default)]
    pub index_base: IndexBase,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub report: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(layer_sizes: Vec<usize>, flows: PathBuf, observations: PathBuf) -> Self {
        Self {
            layer_sizes,
            flows,
            observations,
            index_base: IndexBase::default(),
            solver: SolverConfig::default(),
            report: None,
        }
    }

    /// Load a JSON config; relative paths resolve against the config's directory
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: RunConfig = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.flows = resolve(base, &config.flows);
        config.observations = resolve(base, &config.observations);
        config.report = config.report.map(|report| resolve(base, &report));
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    pub fn layer_index(&self) -> Result<LayerIndex, LayerError> {
        LayerIndex::from_sizes(&self.layer_sizes)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}
