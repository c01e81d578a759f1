//! Forward and backward reachability from a pivot.
//!
//! Every node reached by both searches lies on a cycle through the
//! pivot, so the intersection is exactly the pivot's component. The
//! searches run as BSP waves: local expansion over an active stack,
//! then one frontier exchange per round until the frontier reports the
//! globally empty round.
//!
//! The fused variant folds the intersection test into a single pair of
//! bitsets and reports decisions through a callback; the split variants
//! keep an explicit reachability bitset between the phases.

use bitvec::prelude::*;
use bsp_comm::Communicator;
use graph_part::{BidiGraphPart, Frontier, Partition, Vertex};

use crate::UNDECIDED;

/// Marks every undecided node reachable from `pivot` along out-edges in
/// `fw_reached`.
///
/// The caller must hand in a cleared bitset of `local_n` bits and an
/// empty frontier.
pub fn forward_search<C, P>(
    comm: &C,
    graph: &BidiGraphPart<P>,
    frontier: &mut Frontier<Vertex>,
    scc_id: &[Vertex],
    fw_reached: &mut BitVec<u64>,
    pivot: Vertex,
) where
    C: Communicator,
    P: Partition,
{
    let part = graph.part();
    debug_assert_eq!(fw_reached.len(), part.local_n());
    debug_assert!(!fw_reached.any());
    debug_assert!(!frontier.has_next());

    let mut active = Vec::new();
    if part.has_local(pivot) {
        let k = part.to_local(pivot);
        debug_assert_eq!(scc_id[k], UNDECIDED, "the pivot must be undecided");
        fw_reached.set(k, true);
        active.push(k);
    }

    loop {
        while let Some(k) = active.pop() {
            for &v in graph.out_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if scc_id[l] == UNDECIDED && !fw_reached[l] {
                        fw_reached.set(l, true);
                        active.push(l);
                    }
                } else {
                    frontier.push(part.rank_of(v), v);
                }
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let v = frontier.next();
            debug_assert!(part.has_local(v));
            let l = part.to_local(v);
            if scc_id[l] == UNDECIDED && !fw_reached[l] {
                fw_reached.set(l, true);
                active.push(l);
            }
        }
    }
}

/// Walks the in-edges from `pivot` and decides every forward-reached
/// undecided node into the pivot's component, then rewrites the fresh
/// cells to the component's smallest node id.
///
/// Returns the local number of decisions (counted before the rewrite).
pub fn backward_search<C, P>(
    comm: &C,
    graph: &BidiGraphPart<P>,
    frontier: &mut Frontier<Vertex>,
    scc_id: &mut [Vertex],
    fw_reached: &BitVec<u64>,
    pivot: Vertex,
) -> u64
where
    C: Communicator,
    P: Partition,
{
    let part = graph.part();
    debug_assert!(!frontier.has_next());

    let mut active = Vec::new();
    let mut decided = 0;

    if part.has_local(pivot) {
        let k = part.to_local(pivot);
        if fw_reached[k] && scc_id[k] == UNDECIDED {
            scc_id[k] = pivot;
            decided += 1;
            active.push(k);
        }
    }

    loop {
        while let Some(k) = active.pop() {
            for &v in graph.in_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if fw_reached[l] && scc_id[l] == UNDECIDED {
                        scc_id[l] = pivot;
                        decided += 1;
                        active.push(l);
                    }
                } else {
                    frontier.push(part.rank_of(v), v);
                }
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let v = frontier.next();
            debug_assert!(part.has_local(v));
            let l = part.to_local(v);
            if fw_reached[l] && scc_id[l] == UNDECIDED {
                scc_id[l] = pivot;
                decided += 1;
                active.push(l);
            }
        }
    }

    normalize_class(comm, part, scc_id, pivot);
    decided
}

/// Forward and backward wave in one walk over shared per-node bits.
///
/// The forward phase sets `is_reached` for every undecided node
/// reachable from `pivot`; the backward phase clears `is_reached` and
/// `is_undecided` together and reports each decision through
/// `on_decide(local index, pivot)`. Between the phases every reached
/// node is still undecided, which is what lets one bitset carry both
/// meanings.
///
/// `is_reached` is cleared on entry; `active` must be empty. The caller
/// runs the canonical-id rewrite afterwards via the pipeline.
#[allow(clippy::too_many_arguments)]
pub fn forward_backward_search<C, P, F>(
    comm: &C,
    graph: &BidiGraphPart<P>,
    frontier: &mut Frontier<Vertex>,
    active: &mut Vec<usize>,
    is_reached: &mut BitVec<u64>,
    is_undecided: &mut BitVec<u64>,
    pivot: Vertex,
    mut on_decide: F,
) where
    C: Communicator,
    P: Partition,
    F: FnMut(usize, Vertex),
{
    let part = graph.part();
    debug_assert!(active.is_empty());
    debug_assert!(!frontier.has_next());
    is_reached.fill(false);

    // Forward wave.
    if part.has_local(pivot) {
        let k = part.to_local(pivot);
        debug_assert!(is_undecided[k], "the pivot must be undecided");
        is_reached.set(k, true);
        active.push(k);
    }

    loop {
        while let Some(k) = active.pop() {
            for &v in graph.out_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if is_undecided[l] && !is_reached[l] {
                        is_reached.set(l, true);
                        active.push(l);
                    }
                } else {
                    frontier.push(part.rank_of(v), v);
                }
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let v = frontier.next();
            let l = part.to_local(v);
            if is_undecided[l] && !is_reached[l] {
                is_reached.set(l, true);
                active.push(l);
            }
        }
    }

    // Backward wave: clearing a reached bit is the decision.
    if part.has_local(pivot) {
        let k = part.to_local(pivot);
        is_reached.set(k, false);
        is_undecided.set(k, false);
        on_decide(k, pivot);
        active.push(k);
    }

    loop {
        while let Some(k) = active.pop() {
            for &v in graph.in_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if is_reached[l] {
                        is_reached.set(l, false);
                        debug_assert!(is_undecided[l], "reached nodes stay undecided");
                        is_undecided.set(l, false);
                        on_decide(l, pivot);
                        active.push(l);
                    }
                } else {
                    frontier.push(part.rank_of(v), v);
                }
            }
        }

        if !frontier.comm(comm, part) {
            break;
        }
        while frontier.has_next() {
            let v = frontier.next();
            let l = part.to_local(v);
            if is_reached[l] {
                is_reached.set(l, false);
                is_undecided.set(l, false);
                on_decide(l, pivot);
                active.push(l);
            }
        }
    }
}

/// Rewrites every cell holding `pivot` to the smallest node id of the
/// pivot's component, found by a global min reduction. This establishes
/// the canonical labelling the engine promises.
pub(crate) fn normalize_class<C, P>(comm: &C, part: &P, scc_id: &mut [Vertex], pivot: Vertex)
where
    C: Communicator,
    P: Partition,
{
    let mut local_min = Vertex::MAX;
    for k in 0..part.local_n() {
        if scc_id[k] == pivot {
            local_min = local_min.min(part.to_global(k));
        }
    }

    let class_min = comm.allreduce_min(local_min);
    if class_min != Vertex::MAX && class_min != pivot {
        for k in 0..part.local_n() {
            if scc_id[k] == pivot {
                scc_id[k] = class_min;
            }
        }
    }
}
