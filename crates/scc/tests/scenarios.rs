//! End-to-end component labelling over every partition family and
//! several rank counts.

use bsp_comm::{Communicator, LocalCluster, SingleProcess};
use graph_part::{
    BalancedSlice, BidiGraphPart, BlockCyclic, Cyclic, Edge, Partition, TrivialSlice, Vertex,
};
use scc_engine::{scc, SccConfig, UNDECIDED};

/// Runs the engine on `world_size` in-process ranks and stitches the
/// per-rank labellings back together in partition order.
fn solve<P, M>(
    n: u64,
    edges: &[Edge],
    world_size: usize,
    make_part: M,
    config: SccConfig,
) -> Vec<Vertex>
where
    P: Partition,
    M: Fn(u64, usize, usize) -> P + Sync,
{
    let _ = env_logger::builder().is_test(true).try_init();

    let results = LocalCluster::run(world_size, |comm| {
        let part = make_part(n, comm.world_rank(), comm.world_size());
        let graph = BidiGraphPart::from_global_edges(comm, part, edges).unwrap();
        let local_n = graph.part().local_n();

        let mut scc_id = vec![UNDECIDED; local_n];
        scc(comm, &graph, &mut scc_id, config);

        (0..local_n)
            .map(|k| (graph.part().to_global(k), scc_id[k]))
            .collect::<Vec<_>>()
    });

    let mut global = vec![UNDECIDED; n as usize];
    for labelled in results {
        for (u, id) in labelled {
            assert_eq!(global[u as usize], UNDECIDED, "single owner per node");
            global[u as usize] = id;
        }
    }
    global
}

fn edges(list: &[(Vertex, Vertex)]) -> Vec<Edge> {
    list.iter().copied().map(Edge::from).collect()
}

/// Checks one input against its expected labelling under all four
/// partition families and 1, 2, 3 and 7 ranks.
fn check_everywhere(n: u64, list: &[(Vertex, Vertex)], expected: &[Vertex], config: SccConfig) {
    let edges = edges(list);
    for p in [1, 2, 3, 7] {
        let trivial = solve(n, &edges, p, |n, r, s| TrivialSlice::new(n, r, s), config);
        assert_eq!(trivial, expected, "trivial slice over {p} ranks");

        let balanced = solve(n, &edges, p, |n, r, s| BalancedSlice::new(n, r, s), config);
        assert_eq!(balanced, expected, "balanced slice over {p} ranks");

        let cyclic = solve(n, &edges, p, |n, r, s| Cyclic::new(n, r, s), config);
        assert_eq!(cyclic, expected, "cyclic over {p} ranks");

        let block_cyclic = solve(n, &edges, p, |n, r, s| BlockCyclic::new(n, 2, r, s), config);
        assert_eq!(block_cyclic, expected, "block-cyclic over {p} ranks");
    }
}

const TWO_TRIANGLES_AND_A_PAIR: [(Vertex, Vertex); 11] = [
    (0, 2),
    (1, 0),
    (1, 2),
    (1, 3),
    (2, 0),
    (3, 2),
    (3, 4),
    (4, 1),
    (4, 3),
    (5, 6),
    (6, 5),
];

#[test]
fn three_components_of_seven_nodes() {
    check_everywhere(
        7,
        &TWO_TRIANGLES_AND_A_PAIR,
        &[0, 1, 0, 1, 1, 5, 5],
        SccConfig::default(),
    );
}

#[test]
fn three_components_with_exhaustive_trim() {
    check_everywhere(
        7,
        &TWO_TRIANGLES_AND_A_PAIR,
        &[0, 1, 0, 1, 1, 5, 5],
        SccConfig::new(true, SccConfig::DEFAULT_MAX_LABEL_HOPS),
    );
}

#[test]
fn chain_of_five_singletons() {
    check_everywhere(
        5,
        &[(0, 1), (1, 2), (2, 3), (3, 4)],
        &[0, 1, 2, 3, 4],
        SccConfig::default(),
    );
}

#[test]
fn single_four_cycle() {
    check_everywhere(
        4,
        &[(0, 1), (1, 2), (2, 3), (3, 0)],
        &[0, 0, 0, 0],
        SccConfig::default(),
    );
}

#[test]
fn two_disjoint_three_cycles() {
    check_everywhere(
        6,
        &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)],
        &[0, 0, 0, 3, 3, 3],
        SccConfig::default(),
    );
}

#[test]
fn path_graph_resolves_under_exhaustive_trim() {
    let list: Vec<(Vertex, Vertex)> = (1..10).map(|v| (v - 1, v)).collect();
    let expected: Vec<Vertex> = (0..10).collect();

    check_everywhere(
        10,
        &list,
        &expected,
        SccConfig::new(true, SccConfig::DEFAULT_MAX_LABEL_HOPS),
    );
    check_everywhere(10, &list, &expected, SccConfig::default());
}

#[test]
fn empty_graph() {
    check_everywhere(0, &[], &[], SccConfig::default());
}

#[test]
fn edgeless_graph_is_all_singletons() {
    check_everywhere(5, &[], &[0, 1, 2, 3, 4], SccConfig::default());
}

#[test]
fn fully_strongly_connected_graph() {
    // A 7-cycle with chords: one component, everything labelled 0 by
    // the pivot round alone.
    let mut list: Vec<(Vertex, Vertex)> = (0..7).map(|u| (u, (u + 1) % 7)).collect();
    list.extend([(0, 3), (4, 2), (6, 1)]);

    check_everywhere(7, &list, &[0; 7], SccConfig::default());
}

#[test]
fn one_rank_cluster_matches_the_single_process_reference() {
    let edges = edges(&TWO_TRIANGLES_AND_A_PAIR);

    let comm = SingleProcess;
    let part = TrivialSlice::new(7, comm.world_rank(), comm.world_size());
    let graph = BidiGraphPart::from_global_edges(&comm, part, &edges).unwrap();
    let mut reference = vec![UNDECIDED; 7];
    scc(&comm, &graph, &mut reference, SccConfig::default());

    let clustered = solve(
        7,
        &edges,
        1,
        |n, r, s| TrivialSlice::new(n, r, s),
        SccConfig::default(),
    );

    assert_eq!(clustered, reference);
}
