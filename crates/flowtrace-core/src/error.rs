use crate::solver::SolveMethod;
use crate::{NodeId, F};
use thiserror::Error;

/// Invalid layer-size configuration
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("no layers configured")]
    Empty,

    #[error("at least two layers are required (transient and absorbing), got {count}")]
    TooFewLayers { count: usize },

    #[error("layer {layer} has a non-positive node count")]
    EmptyLayer { layer: usize },

    #[error("layer {layer} overflows the node id space")]
    Overflow { layer: usize },
}

/// Flow network or observations inconsistent with the layered model.
///
/// Node ids are zero-based.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StructureError {
    #[error("flow matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("flow matrix row {row} has {len} entries, expected {expected}")]
    RaggedRow { row: usize, len: usize, expected: usize },

    #[error("edge {origin} -> {destination} is outside a network of {nodes} nodes")]
    EdgeOutOfRange { origin: NodeId, destination: NodeId, nodes: usize },

    #[error("flow matrix has {matrix} nodes but the layers sum to {layers}")]
    NodeCountMismatch { matrix: usize, layers: usize },

    #[error("flow {origin} -> {destination} has invalid weight {weight}")]
    InvalidWeight { origin: NodeId, destination: NodeId, weight: F },

    #[error("interaction between nodes of the same layer {layer}: {origin} -> {destination}")]
    SameLayerFlow { layer: usize, origin: NodeId, destination: NodeId },

    #[error("flow {origin} (layer {origin_layer}) -> {destination} (layer {destination_layer}) runs backward")]
    BackwardFlow {
        origin: NodeId,
        origin_layer: usize,
        destination: NodeId,
        destination_layer: usize,
    },

    #[error("observation set is empty")]
    EmptyObservations,

    #[error("observed node {node} is outside a network of {nodes} nodes")]
    ObservationOutOfRange { node: NodeId, nodes: usize },

    #[error("observed node {node} lies in layer {layer}, not the absorbing layer")]
    ObservationNotAbsorbing { node: NodeId, layer: usize },

    #[error("candidate node {node} is not a transient node")]
    CandidateNotTransient { node: NodeId },
}

/// Failure of a source trace
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TraceError {
    #[error("invalid layer configuration: {0}")]
    Layers(#[from] LayerError),

    #[error("structural inconsistency: {0}")]
    Structure(#[from] StructureError),

    #[error("no candidates found: backward step {step} of {steps} has no predecessors, the observations are unreachable from any first-layer node")]
    NoFeasibleSource { step: usize, steps: usize },

    #[error("no source explains the observations: every candidate has zero likelihood")]
    DegenerateLikelihood,

    #[error("numerically unsolvable network: (I - Q) is singular or ill-conditioned ({method:?} solve)")]
    SingularSystem { method: SolveMethod },

    #[error("numerically unsolvable network: transient flow {origin} -> {destination} does not move to a later layer")]
    CyclicTransientFlow { origin: NodeId, destination: NodeId },
}

impl TraceError {
    /// True for the failures that make the linear system unsolvable
    pub fn is_unsolvable(&self) -> bool {
        matches!(
            self,
            TraceError::SingularSystem { .. } | TraceError::CyclicTransientFlow { .. }
        )
    }
}
