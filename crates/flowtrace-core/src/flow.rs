use crate::{NodeId, StructureError, F};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Weighted directed edge of the flow network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub origin: NodeId,
    pub destination: NodeId,
    pub weight: F,
}

impl FlowEdge {
    pub fn new(origin: NodeId, destination: NodeId, weight: F) -> Self {
        Self { origin, destination, weight }
    }
}

/// Dense square matrix of flow weights, rows = origin, columns = destination.
///
/// Zero means no edge. The core only ever reads it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowMatrix(DMatrix<F>);

impl FlowMatrix {
    pub fn new(weights: DMatrix<F>) -> Result<Self, StructureError> {
        if weights.nrows() != weights.ncols() {
            return Err(StructureError::NotSquare {
                rows: weights.nrows(),
                cols: weights.ncols(),
            });
        }
        Ok(Self(weights))
    }

    /// Build from row-major nested rows
    pub fn from_rows(rows: &[Vec<F>]) -> Result<Self, StructureError> {
        let n = rows.len();
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(StructureError::RaggedRow { row, len: values.len(), expected: n });
            }
        }
        Ok(Self(DMatrix::from_fn(n, n, |i, j| rows[i][j])))
    }

    /// Build an `n` node network from an edge list; repeated edges accumulate
    pub fn from_edges(n: usize, edges: &[FlowEdge]) -> Result<Self, StructureError> {
        let mut weights = DMatrix::zeros(n, n);
        for edge in edges {
            if edge.origin >= n || edge.destination >= n {
                return Err(StructureError::EdgeOutOfRange {
                    origin: edge.origin,
                    destination: edge.destination,
                    nodes: n,
                });
            }
            weights[(edge.origin, edge.destination)] += edge.weight;
        }
        Ok(Self(weights))
    }

    pub fn node_count(&self) -> usize {
        self.0.nrows()
    }

    pub fn weight(&self, origin: NodeId, destination: NodeId) -> F {
        self.0[(origin, destination)]
    }

    pub fn as_matrix(&self) -> &DMatrix<F> {
        &self.0
    }

    /// Origins with strictly positive flow into `node`, in ascending order
    pub fn inbound(&self, node: NodeId) -> impl Iterator<Item = (NodeId, F)> + '_ {
        let rows = if node < self.node_count() { self.node_count() } else { 0 };
        (0..rows)
            .map(move |origin| (origin, self.0[(origin, node)]))
            .filter(|&(_, w)| w > 0.0)
    }

    /// Owned copy of the sub-block `rows x cols`
    pub fn block(&self, rows: Range<NodeId>, cols: Range<NodeId>) -> DMatrix<F> {
        self.0
            .view((rows.start, cols.start), (rows.len(), cols.len()))
            .into_owned()
    }

    pub fn nonzero_count(&self) -> usize {
        self.0.iter().filter(|&&w| w != 0.0).count()
    }
}

/// List the nonzero entries of a dense flow matrix in row-major order
pub fn sparsify(flows: &FlowMatrix) -> Vec<FlowEdge> {
    let n = flows.node_count();
    let mut edges = Vec::with_capacity(flows.nonzero_count());

    for origin in 0..n {
        for destination in 0..n {
            let weight = flows.weight(origin, destination);
            if weight != 0.0 {
                edges.push(FlowEdge::new(origin, destination, weight));
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlowMatrix {
        FlowMatrix::from_rows(&[
            vec![0.0, 0.0, 2.0, 0.5],
            vec![0.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_sparsify_row_major() {
        let edges = sparsify(&sample());
        assert_eq!(
            edges,
            vec![
                FlowEdge::new(0, 2, 2.0),
                FlowEdge::new(0, 3, 0.5),
                FlowEdge::new(1, 3, 1.0),
            ]
        );
    }

    #[test]
    fn test_sparsify_rebuilds_matrix() {
        let flows = sample();
        let rebuilt = FlowMatrix::from_edges(flows.node_count(), &sparsify(&flows)).unwrap();
        assert_eq!(rebuilt, flows);
    }

    #[test]
    fn test_sparsify_empty() {
        let flows = FlowMatrix::new(DMatrix::zeros(3, 3)).unwrap();
        assert!(sparsify(&flows).is_empty());
    }

    #[test]
    fn test_inbound_column_scan() {
        let flows = sample();
        let inbound: Vec<NodeId> = flows.inbound(3).map(|(origin, _)| origin).collect();
        assert_eq!(inbound, vec![0, 1]);
        assert_eq!(flows.inbound(0).count(), 0);
        assert_eq!(flows.inbound(99).count(), 0);
    }

    #[test]
    fn test_block() {
        let flows = sample();
        let r = flows.block(0..2, 2..4);
        assert_eq!(r.shape(), (2, 2));
        assert_eq!(r[(0, 0)], 2.0);
        assert_eq!(r[(1, 1)], 1.0);
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(
            FlowMatrix::new(DMatrix::zeros(2, 3)),
            Err(StructureError::NotSquare { rows: 2, cols: 3 })
        );
        assert_eq!(
            FlowMatrix::from_rows(&[vec![0.0, 1.0], vec![0.0]]),
            Err(StructureError::RaggedRow { row: 1, len: 1, expected: 2 })
        );
        assert!(matches!(
            FlowMatrix::from_edges(2, &[FlowEdge::new(0, 2, 1.0)]),
            Err(StructureError::EdgeOutOfRange { .. })
        ));
    }
}
