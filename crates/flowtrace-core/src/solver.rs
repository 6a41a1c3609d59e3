use crate::{
    sparsify, FlowMatrix, LayerIndex, NodeId, NodeSet, StructureError, TraceError, F,
};
use nalgebra::linalg::LU;
use nalgebra::{DMatrix, Dyn};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for solving `(I - Q) A = R`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveMethod {
    /// LU factorisation of `I - Q`, solved against `R`
    #[default]
    Lu,
    /// Explicit fundamental matrix `N = (I - Q)^-1`, then `N R`
    Inverse,
    /// Row-by-row back substitution over the sparse forward edges
    LayeredSweep,
}

/// Configuration for the source likelihood solver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub method: SolveMethod,
    pub singularity_tolerance: F, // smallest accepted |pivot| relative to the largest
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolveMethod::Lu,
            singularity_tolerance: 1e-12,
        }
    }
}

impl SolverConfig {
    pub fn with_method(method: SolveMethod) -> Self {
        Self { method, ..Self::default() }
    }
}

/// Normalized probability of each candidate being the true source
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceDistribution {
    candidates: NodeSet,
    pmf: Vec<F>,
}

impl SourceDistribution {
    pub fn candidates(&self) -> &NodeSet {
        &self.candidates
    }

    /// Probabilities in candidate order
    pub fn pmf(&self) -> &[F] {
        &self.pmf
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, F)> + '_ {
        self.candidates.iter().copied().zip(self.pmf.iter().copied())
    }

    pub fn probability_of(&self, node: NodeId) -> Option<F> {
        self.candidates.position(node).map(|i| self.pmf[i])
    }

    /// Maximum-probability candidate; the lowest id wins ties
    pub fn most_likely(&self) -> Option<(NodeId, F)> {
        self.iter().fold(None, |best, (node, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((node, p)),
        })
    }
}

/// Absorption weights `A = (I - Q)^-1 R`, transient rows by absorbing columns
pub fn absorption_matrix(
    flows: &FlowMatrix,
    layers: &LayerIndex,
    config: &SolverConfig,
) -> Result<DMatrix<F>, TraceError> {
    if flows.node_count() != layers.node_count() {
        return Err(StructureError::NodeCountMismatch {
            matrix: flows.node_count(),
            layers: layers.node_count(),
        }
        .into());
    }

    let transient = layers.transient_range();
    let absorbing = layers.absorbing_range();
    debug!(
        transient = transient.len(),
        absorbing = absorbing.len(),
        method = ?config.method,
        "solving absorbing chain"
    );

    let absorption = match config.method {
        SolveMethod::Lu | SolveMethod::Inverse => {
            let q = flows.block(transient.clone(), transient.clone());
            let r = flows.block(transient.clone(), absorbing);
            let system = DMatrix::identity(transient.len(), transient.len()) - q;
            let lu = factor(system, config)?;

            let solved = if config.method == SolveMethod::Lu {
                lu.solve(&r)
            } else {
                lu.try_inverse().map(|fundamental| fundamental * r)
            };
            solved.ok_or(TraceError::SingularSystem { method: config.method })?
        }
        SolveMethod::LayeredSweep => layered_sweep(flows, layers)?,
    };

    if absorption.iter().any(|w| !w.is_finite()) {
        return Err(TraceError::SingularSystem { method: config.method });
    }

    Ok(absorption)
}

/// LU factorisation with a relative pivot test for (near-)singularity
fn factor(system: DMatrix<F>, config: &SolverConfig) -> Result<LU<F, Dyn, Dyn>, TraceError> {
    let lu = system.lu();
    let pivots = lu.u().diagonal();

    let largest = pivots.iter().fold(0.0, |m: F, p| m.max(p.abs()));
    let smallest = pivots.iter().fold(F::INFINITY, |m: F, p| m.min(p.abs()));
    if !largest.is_finite() || largest == 0.0 || smallest / largest < config.singularity_tolerance {
        return Err(TraceError::SingularSystem { method: config.method });
    }

    Ok(lu)
}

/// Accumulate `A[i] = R[i] + sum_j Q[i, j] A[j]` from the last transient node
/// backward. Valid only when every transient edge moves to a later layer.
fn layered_sweep(flows: &FlowMatrix, layers: &LayerIndex) -> Result<DMatrix<F>, TraceError> {
    let transient = layers.transient_range();
    let absorbing = layers.absorbing_range();
    let width = absorbing.len();

    let mut outgoing: Vec<Vec<(NodeId, F)>> = vec![Vec::new(); transient.len()];
    for edge in sparsify(flows) {
        if transient.contains(&edge.origin) {
            outgoing[edge.origin - transient.start].push((edge.destination, edge.weight));
        }
    }

    let mut absorption = DMatrix::zeros(transient.len(), width);
    for origin in transient.clone().rev() {
        let row = origin - transient.start;
        let origin_layer = layers.layer_of(origin);

        for &(destination, weight) in &outgoing[row] {
            if absorbing.contains(&destination) {
                absorption[(row, destination - absorbing.start)] += weight;
                continue;
            }
            if layers.layer_of(destination) <= origin_layer {
                return Err(TraceError::CyclicTransientFlow { origin, destination });
            }
            let next = destination - transient.start;
            for col in 0..width {
                let reach = absorption[(next, col)];
                absorption[(row, col)] += weight * reach;
            }
        }
    }

    Ok(absorption)
}

/// Probability of each candidate being the single true source.
///
/// The likelihood of candidate `c` is the product over observed nodes `o` of
/// `A[c, o]`; products are formed in log space and normalized to sum to one.
pub fn solve(
    candidates: &NodeSet,
    observations: &NodeSet,
    flows: &FlowMatrix,
    layers: &LayerIndex,
    config: &SolverConfig,
) -> Result<SourceDistribution, TraceError> {
    let absorption = absorption_matrix(flows, layers, config)?;
    let transient = layers.transient_range();
    let absorbing = layers.absorbing_range();

    for &node in observations {
        if !absorbing.contains(&node) {
            return Err(match layers.layer_of(node) {
                Some(layer) => StructureError::ObservationNotAbsorbing { node, layer },
                None => StructureError::ObservationOutOfRange { node, nodes: layers.node_count() },
            }
            .into());
        }
    }

    let mut log_likelihoods = Vec::with_capacity(candidates.len());
    for &candidate in candidates {
        if !transient.contains(&candidate) {
            return Err(StructureError::CandidateNotTransient { node: candidate }.into());
        }
        let row = candidate - transient.start;
        let log_likelihood: F = observations
            .iter()
            .map(|&observed| absorption[(row, observed - absorbing.start)].ln())
            .sum();
        log_likelihoods.push(log_likelihood);
    }

    let pmf = normalize(&log_likelihoods)?;
    Ok(SourceDistribution {
        candidates: candidates.clone(),
        pmf,
    })
}

fn normalize(log_likelihoods: &[F]) -> Result<Vec<F>, TraceError> {
    let peak = log_likelihoods.iter().copied().fold(F::NEG_INFINITY, F::max);
    if peak == F::NEG_INFINITY {
        return Err(TraceError::DegenerateLikelihood);
    }

    let weights: Vec<F> = log_likelihoods.iter().map(|l| (l - peak).exp()).collect();
    let total: F = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}
