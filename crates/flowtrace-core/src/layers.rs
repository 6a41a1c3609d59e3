use crate::{LayerError, NodeId};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open node id range `[first, last)` of one layer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub first: NodeId,
    pub last: NodeId,
}

impl Layer {
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.last == self.first
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.first <= node && node < self.last
    }

    pub fn range(&self) -> Range<NodeId> {
        self.first..self.last
    }
}

/// Partition of the node id space into ordered, contiguous layers.
///
/// The last layer holds the absorbing nodes, every other layer is transient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LayerIndex {
    layers: Vec<Layer>,
}

impl LayerIndex {
    /// Build boundaries from per-layer node counts
    pub fn from_sizes(sizes: &[usize]) -> Result<Self, LayerError> {
        match sizes.len() {
            0 => return Err(LayerError::Empty),
            1 => return Err(LayerError::TooFewLayers { count: 1 }),
            _ => {}
        }

        let mut layers = Vec::with_capacity(sizes.len());
        let mut first: NodeId = 0;
        for (layer, &size) in sizes.iter().enumerate() {
            if size == 0 {
                return Err(LayerError::EmptyLayer { layer });
            }
            let last = first
                .checked_add(size)
                .ok_or(LayerError::Overflow { layer })?;
            layers.push(Layer { first, last });
            first = last;
        }

        Ok(Self { layers })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, k: usize) -> Option<&Layer> {
        self.layers.get(k)
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::len).collect()
    }

    /// Total node count across all layers
    pub fn node_count(&self) -> usize {
        self.absorbing().last
    }

    /// Layer of possible sources
    pub fn first_layer(&self) -> &Layer {
        &self.layers[0]
    }

    /// Layer of absorbing (observable) nodes
    pub fn absorbing(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    /// Every node before the absorbing layer
    pub fn transient_range(&self) -> Range<NodeId> {
        self.first_layer().first..self.absorbing().first
    }

    pub fn absorbing_range(&self) -> Range<NodeId> {
        self.absorbing().range()
    }

    pub fn is_absorbing(&self, node: NodeId) -> bool {
        self.absorbing().contains(node)
    }

    /// Index of the layer holding `node`, if any
    pub fn layer_of(&self, node: NodeId) -> Option<usize> {
        let k = self.layers.partition_point(|layer| layer.last <= node);
        (k < self.layers.len()).then_some(k)
    }
}
