//! The phase sequencer: trim, pivot round, residual coloring.

use std::time::Instant;

use bitvec::prelude::*;
use bsp_comm::Communicator;
use graph_part::{BidiGraphPart, Edge, Frontier, Partition, Vertex};
use log::info;

use crate::coloring::label_search;
use crate::fwbw::{forward_backward_search, normalize_class};
use crate::pivot::select_pivot_from_candidate;
use crate::trim::{trim_exhaustive_first, trim_first};
use crate::UNDECIDED;

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SccConfig {
    /// Chase trivial-component cascades across ranks instead of
    /// trimming in a single sweep. Pays off on inputs with long
    /// tail-and-tree structure, costs extra rounds elsewhere.
    pub exhaustive_trim: bool,

    /// Bound on label-chain shortcut hops per node and sweep during
    /// residual coloring.
    pub max_label_hops: usize,
}

impl Default for SccConfig {
    fn default() -> Self {
        Self {
            exhaustive_trim: false,
            max_label_hops: SccConfig::DEFAULT_MAX_LABEL_HOPS,
        }
    }
}

impl SccConfig {
    pub const DEFAULT_MAX_LABEL_HOPS: usize = 64;

    pub fn new(exhaustive_trim: bool, max_label_hops: usize) -> Self {
        Self {
            exhaustive_trim,
            max_label_hops,
        }
    }
}

/// Computes strongly connected components of the partitioned graph.
///
/// On return every cell of `scc_id` holds the smallest global node id
/// of the node's component; the concatenation over all ranks in
/// partition order is the global component labelling. Cells may come in
/// uninitialised, the pipeline overwrites them. Every rank must call
/// this collectively with the same configuration.
pub fn scc<C, P>(comm: &C, graph: &BidiGraphPart<P>, scc_id: &mut [Vertex], config: SccConfig)
where
    C: Communicator,
    P: Partition,
{
    let part = graph.part();
    let n = part.n();
    let local_n = part.local_n();
    assert_eq!(scc_id.len(), local_n);

    if n == 0 {
        return;
    }

    // Align the ranks so the phase timings mean the same thing
    // everywhere.
    comm.barrier();

    let mut edge_frontier = Frontier::<Edge>::new(part.world_size(), local_n);

    let phase = Instant::now();
    let (mut local_decided, candidate) = if config.exhaustive_trim {
        trim_exhaustive_first(comm, graph, &mut edge_frontier, scc_id)
    } else {
        trim_first(graph, scc_id)
    };
    let mut global_decided = comm.allreduce_sum(local_decided);
    info!(
        "trim decided {global_decided} of {n} nodes in {:?}",
        phase.elapsed()
    );
    if global_decided == n {
        return;
    }

    let pivot = select_pivot_from_candidate(comm, candidate)
        .expect("nodes remain undecided after trimming");

    let phase = Instant::now();
    let mut vertex_frontier = Frontier::<Vertex>::new(part.world_size(), local_n);
    let mut active = Vec::with_capacity(local_n);
    let mut is_reached = BitVec::<u64>::repeat(false, local_n);
    let mut is_undecided = BitVec::<u64>::repeat(false, local_n);
    for k in 0..local_n {
        if scc_id[k] == UNDECIDED {
            is_undecided.set(k, true);
        }
    }

    forward_backward_search(
        comm,
        graph,
        &mut vertex_frontier,
        &mut active,
        &mut is_reached,
        &mut is_undecided,
        pivot,
        |k, id| {
            scc_id[k] = id;
            local_decided += 1;
        },
    );
    normalize_class(comm, part, scc_id, pivot);

    global_decided = comm.allreduce_sum(local_decided);
    info!(
        "pivot {pivot} raised the decided count to {global_decided} of {n} in {:?}",
        phase.elapsed()
    );
    if global_decided == n {
        return;
    }

    let phase = Instant::now();
    let mut labels = vec![0; local_n];
    let mut rounds = 0;
    while global_decided < n {
        rounds += 1;
        assert!(rounds <= n, "residual coloring failed to make progress");

        label_search(
            comm,
            graph,
            &mut edge_frontier,
            &mut labels,
            &mut active,
            &mut is_reached,
            &mut is_undecided,
            config.max_label_hops,
            |k, id| {
                scc_id[k] = id;
                local_decided += 1;
            },
        );
        global_decided = comm.allreduce_sum(local_decided);
    }
    info!(
        "residual coloring converged after {rounds} rounds in {:?}",
        phase.elapsed()
    );
}
