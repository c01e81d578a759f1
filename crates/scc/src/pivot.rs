//! Pivot selection for the reachability phase.
//!
//! The pivot seeds the forward and backward searches, so a node likely
//! to sit in the largest component is wanted. The usual proxy is the
//! largest product of out- and in-degree; the global winner is found
//! with a commutative max reduction over `(degree product, node id)`
//! pairs.

use bsp_comm::Communicator;
use graph_part::{BidiGraphPart, Partition, Vertex};

use crate::UNDECIDED;

/// A pivot candidate. The derived ordering compares the degree product
/// first and breaks ties towards the greater node id, which makes
/// `allreduce_max` the custom reduction the selection needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DegreeCandidate {
    pub degree_product: u64,
    pub vertex: Vertex,
}

impl DegreeCandidate {
    /// The neutral element of the reduction. A genuine candidate always
    /// has a degree product of at least one: nodes with an empty side
    /// are trimmed before any selection runs.
    pub const NONE: Self = Self {
        degree_product: 0,
        vertex: 0,
    };

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Scans the undecided local nodes and reduces the best
/// `(degree product, node id)` pair across all ranks.
///
/// Returns `None` exactly when no rank has an undecided node left.
pub fn select_pivot<C, P>(
    comm: &C,
    graph: &BidiGraphPart<P>,
    scc_id: &[Vertex],
) -> Option<Vertex>
where
    C: Communicator,
    P: Partition,
{
    let part = graph.part();
    let mut local_max = DegreeCandidate::NONE;

    for k in 0..part.local_n() {
        if scc_id[k] == UNDECIDED {
            let degree_product = (graph.out_degree(k) * graph.in_degree(k)) as u64;
            local_max = local_max.max(DegreeCandidate {
                degree_product,
                vertex: part.to_global(k),
            });
        }
    }

    select_pivot_from_candidate(comm, local_max)
}

/// Reduces an already computed local candidate, e.g. the maximum tracked
/// during the trim sweep.
pub fn select_pivot_from_candidate<C>(comm: &C, local_max: DegreeCandidate) -> Option<Vertex>
where
    C: Communicator,
{
    let winner = comm.allreduce_max(local_max);
    (!winner.is_none()).then_some(winner.vertex)
}
