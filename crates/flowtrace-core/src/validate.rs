use crate::{FlowMatrix, LayerIndex, NodeSet, StructureError};
use tracing::warn;

/// Check that the flow matrix fits the layered model.
///
/// Every nonzero weight must be finite and positive and must move flow to a
/// strictly later layer. Edges that skip layers are accepted but reported,
/// since the fixed-count backward search cannot follow them.
pub fn validate_network(flows: &FlowMatrix, layers: &LayerIndex) -> Result<(), StructureError> {
    let n = flows.node_count();
    if n != layers.node_count() {
        return Err(StructureError::NodeCountMismatch {
            matrix: n,
            layers: layers.node_count(),
        });
    }

    let layer_ids: Vec<usize> = layers
        .layers()
        .iter()
        .enumerate()
        .flat_map(|(k, layer)| std::iter::repeat(k).take(layer.len()))
        .collect();

    let mut skipping = 0usize;
    for origin in 0..n {
        let origin_layer = layer_ids[origin];
        for destination in 0..n {
            let weight = flows.weight(origin, destination);
            if weight == 0.0 {
                continue;
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(StructureError::InvalidWeight { origin, destination, weight });
            }

            let destination_layer = layer_ids[destination];
            if destination_layer == origin_layer {
                return Err(StructureError::SameLayerFlow {
                    layer: origin_layer,
                    origin,
                    destination,
                });
            }
            if destination_layer < origin_layer {
                return Err(StructureError::BackwardFlow {
                    origin,
                    origin_layer,
                    destination,
                    destination_layer,
                });
            }
            if destination_layer > origin_layer + 1 {
                skipping += 1;
            }
        }
    }

    if skipping > 0 {
        warn!(edges = skipping, "forward flows skip layers; backward search ignores these paths");
    }

    Ok(())
}

/// Check that every observation is an absorbing node
pub fn validate_observations(
    observations: &NodeSet,
    layers: &LayerIndex,
) -> Result<(), StructureError> {
    if observations.is_empty() {
        return Err(StructureError::EmptyObservations);
    }

    for &node in observations {
        match layers.layer_of(node) {
            None => {
                return Err(StructureError::ObservationOutOfRange {
                    node,
                    nodes: layers.node_count(),
                })
            }
            Some(layer) if layer + 1 != layers.num_layers() => {
                return Err(StructureError::ObservationNotAbsorbing { node, layer })
            }
            Some(_) => {}
        }
    }

    Ok(())
}
