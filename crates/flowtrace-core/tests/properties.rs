use flowtrace_core::{
    predecessors, solve, trace_candidates, trace_source, FlowMatrix, LayerIndex, NodeSet,
    SolveMethod, SolverConfig, TraceError,
};
use nalgebra::DMatrix;
use proptest::prelude::*;

/// Random forward-only network between adjacent layers where every
/// non-source node has at least one inbound edge.
fn layered_network() -> impl Strategy<Value = (LayerIndex, FlowMatrix)> {
    prop::collection::vec(1usize..4, 2..5)
        .prop_flat_map(|sizes| {
            let n: usize = sizes.iter().sum();
            (
                Just(sizes),
                prop::collection::vec(0.05f64..1.0, n * n),
                prop::collection::vec(any::<bool>(), n * n),
            )
        })
        .prop_map(|(sizes, weights, mask)| {
            let layers = LayerIndex::from_sizes(&sizes).unwrap();
            let n = layers.node_count();
            let mut m = DMatrix::zeros(n, n);

            for pair in layers.layers().windows(2) {
                let (from, to) = (pair[0], pair[1]);
                for j in to.range() {
                    for i in from.range() {
                        if mask[i * n + j] {
                            m[(i, j)] = weights[i * n + j];
                        }
                    }
                    if from.range().all(|i| m[(i, j)] == 0.0) {
                        m[(from.first, j)] = weights[from.first * n + j];
                    }
                }
            }

            (layers, FlowMatrix::new(m).unwrap())
        })
}

proptest! {
    #[test]
    fn predecessors_sorted_and_distinct(
        (_, flows) in layered_network(),
        picks in prop::collection::vec(0usize..64, 0..12),
    ) {
        let n = flows.node_count();
        let nodes: Vec<usize> = picks.iter().map(|p| p % n).collect();
        let parents = predecessors(&nodes, &flows);

        prop_assert!(parents.windows(2).all(|w| w[0] < w[1]));

        let mut shuffled = nodes.clone();
        shuffled.reverse();
        shuffled.extend(nodes.iter().copied());
        prop_assert_eq!(predecessors(&shuffled, &flows), parents);
    }

    #[test]
    fn first_layer_has_no_predecessors((layers, flows) in layered_network()) {
        let sources: Vec<usize> = layers.first_layer().range().collect();
        prop_assert!(predecessors(&sources, &flows).is_empty());
    }

    #[test]
    fn candidates_lie_in_first_layer(
        (layers, flows) in layered_network(),
        pick in 0usize..64,
    ) {
        let absorbing = layers.absorbing_range();
        let obs = NodeSet::from_unsorted(vec![absorbing.start + pick % absorbing.len()]);
        let trail = trace_candidates(&obs, &flows, &layers).unwrap();

        prop_assert_eq!(trail.depth(), layers.num_layers() - 1);
        prop_assert!(!trail.candidates().is_empty());
        prop_assert!(trail.candidates().iter().all(|&c| layers.first_layer().contains(c)));
    }

    #[test]
    fn single_observation_gives_a_pmf(
        (layers, flows) in layered_network(),
        pick in 0usize..64,
    ) {
        let absorbing = layers.absorbing_range();
        let obs = [absorbing.start + pick % absorbing.len()];
        let outcome = trace_source(&flows, &layers, &obs, &SolverConfig::default()).unwrap();

        let pmf = outcome.distribution.pmf();
        prop_assert_eq!(pmf.len(), outcome.candidates().len());
        prop_assert!(pmf.iter().all(|&p| p >= 0.0));
        prop_assert!((pmf.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multiple_observations_sum_to_one_or_degenerate(
        (layers, flows) in layered_network(),
        picks in prop::collection::vec(0usize..64, 1..4),
    ) {
        let absorbing = layers.absorbing_range();
        let obs: Vec<usize> = picks.iter().map(|p| absorbing.start + p % absorbing.len()).collect();

        match trace_source(&flows, &layers, &obs, &SolverConfig::default()) {
            Ok(outcome) => {
                let pmf = outcome.distribution.pmf();
                prop_assert!(pmf.iter().all(|&p| p >= 0.0));
                prop_assert!((pmf.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
            Err(err) => prop_assert_eq!(err, TraceError::DegenerateLikelihood),
        }
    }

    #[test]
    fn solve_methods_agree(
        (layers, flows) in layered_network(),
        pick in 0usize..64,
    ) {
        let absorbing = layers.absorbing_range();
        let obs = NodeSet::from_unsorted(vec![absorbing.start + pick % absorbing.len()]);
        let candidates = trace_candidates(&obs, &flows, &layers).unwrap().candidates().clone();

        let reference = solve(&candidates, &obs, &flows, &layers, &SolverConfig::default()).unwrap();
        for method in [SolveMethod::Inverse, SolveMethod::LayeredSweep] {
            let other = solve(&candidates, &obs, &flows, &layers, &SolverConfig::with_method(method)).unwrap();
            for (a, b) in reference.pmf().iter().zip(other.pmf()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn identical_inputs_identical_output(
        (layers, flows) in layered_network(),
        pick in 0usize..64,
    ) {
        let absorbing = layers.absorbing_range();
        let obs = [absorbing.start + pick % absorbing.len()];
        let config = SolverConfig::default();

        let first = trace_source(&flows, &layers, &obs, &config).unwrap();
        let second = trace_source(&flows, &layers, &obs, &config).unwrap();
        prop_assert_eq!(first, second);
    }
}
