//! Property-based tests for tactus-core.
//!
//! Random topologies (cycles included) must always order every node exactly
//! once, and the clock must advance by exactly the buffer size regardless of
//! tempo, host timing, or transport history.

use proptest::prelude::*;
use tactus_core::{
    ClockConfig, Connection, CyclePolicy, GraphConfig, MAX_BPM, MIN_BPM, Node, NodeId,
    PrecisionClock, ProcessingGraph,
};

/// Builds a graph with `nodes` nodes and the given edges (indices taken modulo
/// the node count).
fn build_graph(
    nodes: usize,
    edges: &[(usize, usize)],
    policy: CyclePolicy,
) -> (ProcessingGraph, Vec<NodeId>) {
    let graph = ProcessingGraph::new(GraphConfig {
        cycle_policy: policy,
        ..GraphConfig::default()
    });
    let ids: Vec<NodeId> = (0..nodes)
        .map(|i| graph.add_node(Node::new(format!("n{i}"))).unwrap())
        .collect();
    for &(from, to) in edges {
        // Rejected cycles are expected under RejectCycles.
        let _ = graph.add_connection(Connection::new(ids[from % nodes], ids[to % nodes]));
    }
    (graph, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Every node appears exactly once in the order, cycles or not.
    #[test]
    fn order_is_a_permutation(
        nodes in 1usize..24,
        edges in prop::collection::vec((0usize..64, 0usize..64), 0..64),
    ) {
        let (graph, ids) = build_graph(nodes, &edges, CyclePolicy::SkipBackEdges);
        let order = graph.processing_order();
        let mut seen: Vec<NodeId> = order.ids().collect();
        seen.sort();
        let mut expected = ids.clone();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }

    /// Without back-edges, every connection runs forward in the order.
    #[test]
    fn acyclic_order_respects_connections(
        nodes in 1usize..24,
        edges in prop::collection::vec((0usize..64, 0usize..64), 0..64),
    ) {
        let (graph, _) = build_graph(nodes, &edges, CyclePolicy::RejectCycles);
        let order = graph.processing_order();
        prop_assert_eq!(order.skipped_back_edges(), 0);
        for connection in graph.connections() {
            let from = order.position(connection.source).unwrap();
            let to = order.position(connection.destination).unwrap();
            prop_assert!(from < to, "{} must precede {}", connection.source, connection.destination);
        }
    }

    /// Back-edges are only skipped when the graph really has a cycle.
    #[test]
    fn skipped_edges_imply_cycle(
        nodes in 1usize..12,
        edges in prop::collection::vec((0usize..32, 0usize..32), 0..24),
    ) {
        let (lenient, _) = build_graph(nodes, &edges, CyclePolicy::SkipBackEdges);
        let (strict, _) = build_graph(nodes, &edges, CyclePolicy::RejectCycles);
        let skipped = lenient.processing_order().skipped_back_edges();
        let rejected = lenient.connection_count() - strict.connection_count();
        prop_assert_eq!(skipped == 0, rejected == 0);
    }

    /// Tempo is always clamped into range.
    #[test]
    fn tempo_is_clamped(bpm in -1000.0f64..1000.0) {
        let clock = PrecisionClock::new(ClockConfig::default());
        clock.set_tempo(bpm);
        prop_assert!((MIN_BPM..=MAX_BPM).contains(&clock.bpm()));
    }

    /// The sample position advances by exactly the buffer size whatever the
    /// host timestamps look like, and the sub-sample offset stays bounded.
    #[test]
    fn position_ignores_host_jitter(
        buffer in 16usize..2048,
        jitter in prop::collection::vec(-0.002f64..0.002, 1..200),
    ) {
        let clock = PrecisionClock::new(ClockConfig::default().with_audio(48000.0, buffer));
        clock.start();
        let period = buffer as f64 / 48000.0;
        for (i, offset) in jitter.iter().enumerate() {
            let timing = clock.process_buffer(i as f64 * period + offset, buffer);
            prop_assert_eq!(timing.sample_position, (i * buffer) as u64);
            prop_assert!(timing.fractional_offset.abs() <= 1.0);
        }
        prop_assert_eq!(clock.sample_position(), (jitter.len() * buffer) as u64);
    }

    /// Evenly spaced callbacks never trigger a correction.
    #[test]
    fn exact_timestamps_need_no_correction(
        buffer in 16usize..2048,
        start in 0.0f64..10_000.0,
        calls in 1usize..300,
    ) {
        let clock = PrecisionClock::new(ClockConfig::default().with_audio(48000.0, buffer));
        clock.start();
        let period = buffer as f64 / 48000.0;
        for i in 0..calls {
            clock.process_buffer(start + i as f64 * period, buffer);
        }
        let timing = clock.current_timing();
        prop_assert_eq!(timing.sample_position, (calls * buffer) as u64);
        prop_assert_eq!(timing.accuracy.correction_count, 0);
    }
}
