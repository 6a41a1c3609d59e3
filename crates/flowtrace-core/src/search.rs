use crate::{FlowMatrix, LayerIndex, NodeId, NodeSet, TraceError};
use serde::Serialize;
use tracing::debug;

/// Every node with strictly positive flow into at least one of `nodes`.
///
/// Input order and duplicates do not matter; the result is sorted and
/// distinct.
pub fn predecessors(nodes: &[NodeId], flows: &FlowMatrix) -> NodeSet {
    nodes
        .iter()
        .flat_map(|&node| flows.inbound(node).map(|(origin, _)| origin))
        .collect()
}

/// Snapshots of the backward search, observations first, candidates last
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateTrail {
    steps: Vec<NodeSet>,
}

impl CandidateTrail {
    /// Every snapshot, never empty
    pub fn steps(&self) -> &[NodeSet] {
        &self.steps
    }

    pub fn observations(&self) -> &NodeSet {
        &self.steps[0]
    }

    /// First-layer nodes that can reach at least one observation
    pub fn candidates(&self) -> &NodeSet {
        &self.steps[self.steps.len() - 1]
    }

    /// Number of backward steps taken
    pub fn depth(&self) -> usize {
        self.steps.len() - 1
    }
}

/// Walk back from the observations once per layer boundary.
///
/// Fails with [`TraceError::NoFeasibleSource`] as soon as a step finds no
/// predecessors.
pub fn trace_candidates(
    observations: &NodeSet,
    flows: &FlowMatrix,
    layers: &LayerIndex,
) -> Result<CandidateTrail, TraceError> {
    let steps = layers.num_layers() - 1;
    let mut trail = Vec::with_capacity(steps + 1);
    trail.push(observations.clone());

    for step in 1..=steps {
        let parents = predecessors(&trail[step - 1], flows);
        debug!(step, steps, found = parents.len(), "backward step");
        if parents.is_empty() {
            return Err(TraceError::NoFeasibleSource { step, steps });
        }
        trail.push(parents);
    }

    Ok(CandidateTrail { steps: trail })
}
