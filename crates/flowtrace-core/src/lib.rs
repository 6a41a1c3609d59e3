pub mod error;
pub mod layers;
pub mod flow;
pub mod nodes;
pub mod validate;
pub mod search;
pub mod solver;
pub mod pipeline;

/// Core types
pub type NodeId = usize;
pub type F = f64;

pub type Result<T> = std::result::Result<T, TraceError>;

pub use error::{LayerError, StructureError, TraceError};
pub use layers::{Layer, LayerIndex};
pub use flow::{sparsify, FlowEdge, FlowMatrix};
pub use nodes::NodeSet;
pub use validate::{validate_network, validate_observations};
pub use search::{predecessors, trace_candidates, CandidateTrail};
pub use solver::{absorption_matrix, solve, SolveMethod, SolverConfig, SourceDistribution};
pub use pipeline::{trace_source, TraceOutcome};
