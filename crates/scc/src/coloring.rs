//! Residual solver: min-label propagation with per-class finishing.
//!
//! After the pivot round, the undecided nodes form small components
//! scattered over the ranks. One `label_search` round works in three
//! steps:
//!
//! 1. Every undecided node starts with its own id as label and the
//!    minimum label floods both edge directions to convergence, with a
//!    bounded label-chain shortcut pass between sweeps. A converged
//!    label class is exactly one weakly connected residual piece, owned
//!    by its smallest node (the root).
//! 2. Classes that touch no remote node are finished outright by a
//!    sequential component pass over the class subgraph. On a single
//!    rank this resolves the whole residual in one round.
//! 3. The remaining classes decide the root's component: a fused
//!    forward/backward wave seeded at every root at once. Distinct
//!    classes are not connected, so the waves cannot interfere, and the
//!    root is the smallest node of its component, so the label is
//!    already the canonical id.
//!
//! Each round decides at least the root component of every surviving
//! class, so the caller's loop terminates.

use ahash::{AHashMap, AHashSet};
use bitvec::prelude::*;
use bsp_comm::Communicator;
use graph_part::{BidiGraphPart, Edge, Frontier, Partition, Vertex};
use log::debug;

use crate::tarjan::tarjan_scc;

/// One residual round. Decisions are reported as
/// `on_decide(local index, component id)`; the corresponding
/// `is_undecided` bits are cleared here.
///
/// `labels` is per-round scratch of `local_n` cells; `is_reached` is the
/// scratch bitset of the embedded forward/backward wave; `active` must
/// come in empty. `max_label_hops` bounds the label-chain shortcut.
#[allow(clippy::too_many_arguments)]
pub fn label_search<C, P, F>(
    comm: &C,
    graph: &BidiGraphPart<P>,
    frontier: &mut Frontier<Edge>,
    labels: &mut [Vertex],
    active: &mut Vec<usize>,
    is_reached: &mut BitVec<u64>,
    is_undecided: &mut BitVec<u64>,
    max_label_hops: usize,
    mut on_decide: F,
) where
    C: Communicator,
    P: Partition,
    F: FnMut(usize, Vertex),
{
    let part = graph.part();
    let local_n = part.local_n();
    debug_assert_eq!(labels.len(), local_n);
    debug_assert!(active.is_empty());
    debug_assert!(!frontier.has_next());

    // Step 1: minimum-label flood over the residual subgraph.
    for k in 0..local_n {
        if is_undecided[k] {
            labels[k] = part.to_global(k);
            active.push(k);
        }
    }

    loop {
        loop {
            while let Some(k) = active.pop() {
                let label = labels[k];
                for &v in graph.out_neighbors(k).iter().chain(graph.in_neighbors(k)) {
                    if part.has_local(v) {
                        let l = part.to_local(v);
                        if is_undecided[l] && labels[l] > label {
                            labels[l] = label;
                            active.push(l);
                        }
                    } else {
                        frontier.push(part.rank_of(v), Edge { u: v, v: label });
                    }
                }
            }

            // Shortcut label chains: a node labelled `m` may adopt the
            // label of `m` itself, as long as the chain stays local.
            for k in 0..local_n {
                if !is_undecided[k] {
                    continue;
                }
                let mut root = labels[k];
                let mut hops = 0;
                while hops < max_label_hops && part.has_local(root) {
                    let l = part.to_local(root);
                    if !is_undecided[l] {
                        break;
                    }
                    let next = labels[l];
                    if next == root {
                        break;
                    }
                    root = next;
                    hops += 1;
                }
                if root < labels[k] {
                    labels[k] = root;
                    active.push(k);
                }
            }

            if active.is_empty() {
                break;
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let message = frontier.next();
            let l = part.to_local(message.u);
            if is_undecided[l] && labels[l] > message.v {
                labels[l] = message.v;
                active.push(l);
            }
        }
    }

    // Step 2: classes without any remote edge are fully visible here;
    // finish them with a sequential component pass. A class member with
    // a remote neighbour taints the whole class, conservatively even
    // when the neighbour is already decided.
    let mut tainted = AHashSet::new();
    for k in 0..local_n {
        if is_undecided[k]
            && graph
                .out_neighbors(k)
                .iter()
                .chain(graph.in_neighbors(k))
                .any(|&v| !part.has_local(v))
        {
            tainted.insert(labels[k]);
        }
    }

    let mut classes: AHashMap<Vertex, Vec<usize>> = AHashMap::new();
    for k in 0..local_n {
        if is_undecided[k] && !tainted.contains(&labels[k]) {
            classes.entry(labels[k]).or_default().push(k);
        }
    }

    if !classes.is_empty() {
        debug!(
            "rank {}: finishing {} rank-local residual classes",
            part.world_rank(),
            classes.len()
        );
    }

    for members in classes.values() {
        let position: AHashMap<usize, usize> = members
            .iter()
            .enumerate()
            .map(|(index, &k)| (k, index))
            .collect();

        let adjacency: Vec<Vec<usize>> = members
            .iter()
            .map(|&k| {
                graph
                    .out_neighbors(k)
                    .iter()
                    .filter_map(|&v| position.get(&part.to_local(v)).copied())
                    .collect()
            })
            .collect();

        for component in tarjan_scc(&adjacency) {
            let id = component
                .iter()
                .map(|&index| part.to_global(members[index]))
                .min()
                .expect("components are never empty");
            for &index in &component {
                let k = members[index];
                is_undecided.set(k, false);
                on_decide(k, id);
            }
        }
    }

    // Step 3: decide the root component of every surviving class with
    // one multi-seeded forward/backward wave. Messages carry the class
    // label so receivers can sanity-check the routing.
    is_reached.fill(false);
    debug_assert!(active.is_empty());

    for k in 0..local_n {
        if is_undecided[k] && labels[k] == part.to_global(k) {
            is_reached.set(k, true);
            active.push(k);
        }
    }

    loop {
        while let Some(k) = active.pop() {
            let label = labels[k];
            for &v in graph.out_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if is_undecided[l] && !is_reached[l] {
                        debug_assert_eq!(labels[l], label, "classes cannot meet");
                        is_reached.set(l, true);
                        active.push(l);
                    }
                } else {
                    frontier.push(part.rank_of(v), Edge { u: v, v: label });
                }
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let message = frontier.next();
            let l = part.to_local(message.u);
            if is_undecided[l] && !is_reached[l] {
                debug_assert_eq!(labels[l], message.v, "classes cannot meet");
                is_reached.set(l, true);
                active.push(l);
            }
        }
    }

    for k in 0..local_n {
        if is_undecided[k] && labels[k] == part.to_global(k) {
            debug_assert!(is_reached[k], "a root reaches itself");
            is_reached.set(k, false);
            is_undecided.set(k, false);
            on_decide(k, labels[k]);
            active.push(k);
        }
    }

    loop {
        while let Some(k) = active.pop() {
            let label = labels[k];
            for &v in graph.in_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if is_reached[l] {
                        is_reached.set(l, false);
                        is_undecided.set(l, false);
                        on_decide(l, labels[l]);
                        active.push(l);
                    }
                } else {
                    frontier.push(part.rank_of(v), Edge { u: v, v: label });
                }
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let message = frontier.next();
            let l = part.to_local(message.u);
            if is_reached[l] {
                debug_assert_eq!(labels[l], message.v, "classes cannot meet");
                is_reached.set(l, false);
                is_undecided.set(l, false);
                on_decide(l, labels[l]);
                active.push(l);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UNDECIDED;
    use bsp_comm::{LocalCluster, SingleProcess};
    use graph_part::{Cyclic, TrivialSlice};

    fn edges(list: &[(Vertex, Vertex)]) -> Vec<Edge> {
        list.iter().copied().map(Edge::from).collect()
    }

    fn run_round<C: Communicator, P: Partition>(
        comm: &C,
        graph: &BidiGraphPart<P>,
        scc_id: &mut [Vertex],
    ) -> u64 {
        let local_n = graph.part().local_n();
        let mut frontier = Frontier::new(comm.world_size(), local_n);
        let mut labels = vec![0; local_n];
        let mut active = Vec::new();
        let mut is_reached = BitVec::<u64>::repeat(false, local_n);
        let mut is_undecided = BitVec::<u64>::repeat(false, local_n);
        for k in 0..local_n {
            if scc_id[k] == UNDECIDED {
                is_undecided.set(k, true);
            }
        }

        let mut decided = 0;
        label_search(
            comm,
            graph,
            &mut frontier,
            &mut labels,
            &mut active,
            &mut is_reached,
            &mut is_undecided,
            64,
            |k, id| {
                scc_id[k] = id;
                decided += 1;
            },
        );
        decided
    }

    #[test]
    fn single_rank_residual_resolves_in_one_round() {
        // Two 2-cycles bridged by an edge: one weak piece, two
        // components, plus an isolated 2-cycle.
        let comm = SingleProcess;
        let part = TrivialSlice::new(6, 0, 1);
        let graph = BidiGraphPart::from_global_edges(
            &comm,
            part,
            &edges(&[(0, 1), (1, 0), (1, 2), (2, 3), (3, 2), (4, 5), (5, 4)]),
        )
        .unwrap();
        let mut scc_id = vec![UNDECIDED; 6];

        let decided = run_round(&comm, &graph, &mut scc_id);

        assert_eq!(decided, 6);
        assert_eq!(scc_id, vec![0, 0, 2, 2, 4, 4]);
    }

    #[test]
    fn spanning_classes_decide_their_root_component_first() {
        // 0 <-> 1 -> 2 <-> 3 under a cyclic partition: the weak piece
        // spans both ranks, so round one decides {0, 1} and round two
        // decides {2, 3}.
        let list = [(0, 1), (1, 0), (1, 2), (2, 3), (3, 2)];

        let results = LocalCluster::run(2, |comm| {
            let part = Cyclic::new(4, comm.world_rank(), comm.world_size());
            let graph = BidiGraphPart::from_global_edges(comm, part, &edges(&list)).unwrap();
            let local_n = graph.part().local_n();
            let mut scc_id = vec![UNDECIDED; local_n];

            let first = run_round(comm, &graph, &mut scc_id);
            let after_first: Vec<(Vertex, Vertex)> = (0..local_n)
                .map(|k| (graph.part().to_global(k), scc_id[k]))
                .collect();

            let second = run_round(comm, &graph, &mut scc_id);
            let after_second: Vec<(Vertex, Vertex)> = (0..local_n)
                .map(|k| (graph.part().to_global(k), scc_id[k]))
                .collect();

            (first, after_first, second, after_second)
        });

        let mut first_total = 0;
        let mut second_total = 0;
        let mut final_ids = vec![UNDECIDED; 4];
        for (first, after_first, second, after_second) in results {
            first_total += first;
            second_total += second;
            for (u, id) in after_first {
                if u == 0 || u == 1 {
                    assert_eq!(id, 0);
                } else {
                    assert_eq!(id, UNDECIDED);
                }
            }
            for (u, id) in after_second {
                final_ids[u as usize] = id;
            }
        }

        assert_eq!(first_total, 2);
        assert_eq!(second_total, 2);
        assert_eq!(final_ids, vec![0, 0, 2, 2]);
    }

    #[test]
    fn decided_nodes_are_ignored() {
        // Nodes 0 and 1 already carry a component; only the 2-cycle
        // {2, 3} is left.
        let comm = SingleProcess;
        let part = TrivialSlice::new(4, 0, 1);
        let graph = BidiGraphPart::from_global_edges(
            &comm,
            part,
            &edges(&[(0, 1), (1, 0), (1, 2), (2, 3), (3, 2)]),
        )
        .unwrap();
        let mut scc_id = vec![0, 0, UNDECIDED, UNDECIDED];

        let decided = run_round(&comm, &graph, &mut scc_id);

        assert_eq!(decided, 2);
        assert_eq!(scc_id, vec![0, 0, 2, 2]);
    }

    #[test]
    fn empty_residual_is_a_no_op_on_every_rank() {
        let results = LocalCluster::run(3, |comm| {
            let part = Cyclic::new(3, comm.world_rank(), comm.world_size());
            let graph =
                BidiGraphPart::from_global_edges(comm, part, &edges(&[(0, 1), (1, 2)])).unwrap();
            let mut scc_id = vec![0; graph.part().local_n()];
            run_round(comm, &graph, &mut scc_id)
        });

        assert_eq!(results, vec![0, 0, 0]);
    }
}
