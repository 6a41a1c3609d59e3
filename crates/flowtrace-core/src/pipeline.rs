use crate::{
    solve, trace_candidates, validate_network, validate_observations, CandidateTrail, FlowMatrix,
    LayerIndex, NodeId, NodeSet, SolverConfig, SourceDistribution, TraceError, F,
};
use serde::Serialize;
use tracing::{info, info_span};

/// Result of one source trace
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceOutcome {
    pub trail: CandidateTrail,
    pub distribution: SourceDistribution,
}

impl TraceOutcome {
    pub fn observations(&self) -> &NodeSet {
        self.trail.observations()
    }

    /// Feasible first-layer sources, unranked
    pub fn candidates(&self) -> &NodeSet {
        self.trail.candidates()
    }

    pub fn most_likely(&self) -> Option<(NodeId, F)> {
        self.distribution.most_likely()
    }
}

/// Validate the network, search candidates backward from the observations,
/// and solve for the source distribution.
pub fn trace_source(
    flows: &FlowMatrix,
    layers: &LayerIndex,
    observations: &[NodeId],
    config: &SolverConfig,
) -> Result<TraceOutcome, TraceError> {
    let span = info_span!("trace_source", nodes = flows.node_count(), layers = layers.num_layers());
    let _enter = span.enter();

    validate_network(flows, layers)?;
    let observations: NodeSet = observations.iter().copied().collect();
    validate_observations(&observations, layers)?;

    let trail = trace_candidates(&observations, flows, layers)?;
    info!(
        observations = observations.len(),
        candidates = trail.candidates().len(),
        "found feasible sources"
    );

    let distribution = solve(trail.candidates(), &observations, flows, layers, config)?;
    if let Some((node, p)) = distribution.most_likely() {
        info!(node, probability = p, "most likely source");
    }

    Ok(TraceOutcome { trail, distribution })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlowEdge, StructureError};

    #[test]
    fn test_unsorted_observations_are_normalized() {
        let edges = [
            FlowEdge::new(0, 2, 1.0),
            FlowEdge::new(1, 2, 1.0),
            FlowEdge::new(1, 3, 1.0),
        ];
        let flows = FlowMatrix::from_edges(4, &edges).unwrap();
        let layers = LayerIndex::from_sizes(&[2, 2]).unwrap();

        let outcome = trace_source(&flows, &layers, &[3, 2, 3], &SolverConfig::default()).unwrap();
        assert_eq!(outcome.observations().as_slice(), &[2, 3]);
        assert_eq!(outcome.candidates().as_slice(), &[0, 1]);
        assert_eq!(outcome.distribution.pmf(), &[0.0, 1.0]);
        assert_eq!(outcome.most_likely(), Some((1, 1.0)));
    }

    #[test]
    fn test_validation_runs_first() {
        let edges = [FlowEdge::new(0, 1, 1.0), FlowEdge::new(0, 2, 1.0)];
        let flows = FlowMatrix::from_edges(3, &edges).unwrap();
        let layers = LayerIndex::from_sizes(&[2, 1]).unwrap();

        assert_eq!(
            trace_source(&flows, &layers, &[2], &SolverConfig::default()),
            Err(TraceError::Structure(StructureError::SameLayerFlow {
                layer: 0,
                origin: 0,
                destination: 1,
            }))
        );
    }

    #[test]
    fn test_observation_must_be_absorbing() {
        let flows = FlowMatrix::from_edges(3, &[FlowEdge::new(0, 2, 1.0)]).unwrap();
        let layers = LayerIndex::from_sizes(&[2, 1]).unwrap();

        assert!(matches!(
            trace_source(&flows, &layers, &[1], &SolverConfig::default()),
            Err(TraceError::Structure(StructureError::ObservationNotAbsorbing { node: 1, layer: 0 }))
        ));
    }
}
