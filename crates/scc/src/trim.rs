//! Removal of trivial components.
//!
//! A node with no in-edges or no out-edges cannot sit on a directed
//! cycle, so it forms a singleton component. Removing such nodes can
//! expose new trivial nodes; the exhaustive variant chases that cascade
//! across rank borders, the plain variants stop after one sweep.

use bsp_comm::Communicator;
use graph_part::{BidiGraphPart, Edge, Frontier, Partition, Vertex};

use crate::pivot::DegreeCandidate;
use crate::UNDECIDED;

/// Notification payloads for the exhaustive cascade: the owner of the
/// message target drops one edge from the named residual side.
const DEC_OUT: Vertex = 0;
const DEC_IN: Vertex = 1;

/// One sweep over the local nodes. Nodes with an empty edge side are
/// decided as singletons, every other cell is reset to [`UNDECIDED`].
///
/// Returns the local decided count and the best pivot candidate among
/// the surviving nodes. No communication happens.
pub fn trim_first<P>(graph: &BidiGraphPart<P>, scc_id: &mut [Vertex]) -> (u64, DegreeCandidate)
where
    P: Partition,
{
    let part = graph.part();
    debug_assert_eq!(scc_id.len(), part.local_n());

    let mut decided = 0;
    let mut candidate = DegreeCandidate::NONE;

    for k in 0..part.local_n() {
        let out_degree = graph.out_degree(k);
        let in_degree = graph.in_degree(k);

        if out_degree == 0 || in_degree == 0 {
            scc_id[k] = part.to_global(k);
            decided += 1;
            continue;
        }

        scc_id[k] = UNDECIDED;
        candidate = candidate.max(DegreeCandidate {
            degree_product: (out_degree * in_degree) as u64,
            vertex: part.to_global(k),
        });
    }

    (decided, candidate)
}

/// Re-scans undecided nodes against the current decisions: a node whose
/// remaining neighbours on one side are all locally decided becomes a
/// singleton. Remote neighbours are conservatively assumed undecided,
/// so this pass never communicates and never over-decides.
pub fn trim_residual<P>(graph: &BidiGraphPart<P>, scc_id: &mut [Vertex]) -> u64
where
    P: Partition,
{
    let part = graph.part();
    let mut decided = 0;

    for k in 0..part.local_n() {
        if scc_id[k] != UNDECIDED {
            continue;
        }

        let live = |neighbors: &[Vertex]| {
            neighbors
                .iter()
                .any(|&v| !part.has_local(v) || scc_id[part.to_local(v)] == UNDECIDED)
        };

        if !live(graph.out_neighbors(k)) || !live(graph.in_neighbors(k)) {
            scc_id[k] = part.to_global(k);
            decided += 1;
        }
    }

    decided
}

/// Iterated trimming with cross-rank cascades.
///
/// Residual degree counters start at the full degrees; whenever a node
/// is decided, each neighbour loses one edge on the matching side. Local
/// losses cascade immediately, remote ones travel as frontier messages.
/// Rounds continue until a global reduction reports that no rank decided
/// anything new, so no rank can leave while notifications are still in
/// flight. A path graph is fully decided in one invocation.
///
/// Returns the local decided count and a pivot candidate computed from
/// the residual degrees, which makes the later selection more accurate
/// than one over the full degrees.
pub fn trim_exhaustive_first<C, P>(
    comm: &C,
    graph: &BidiGraphPart<P>,
    frontier: &mut Frontier<Edge>,
    scc_id: &mut [Vertex],
) -> (u64, DegreeCandidate)
where
    C: Communicator,
    P: Partition,
{
    let part = graph.part();
    let local_n = part.local_n();
    debug_assert_eq!(scc_id.len(), local_n);
    debug_assert!(!frontier.has_next());

    let mut out_residual: Vec<usize> = (0..local_n).map(|k| graph.out_degree(k)).collect();
    let mut in_residual: Vec<usize> = (0..local_n).map(|k| graph.in_degree(k)).collect();

    let mut active = Vec::new();
    let mut decided = 0;

    for k in 0..local_n {
        if out_residual[k] == 0 || in_residual[k] == 0 {
            scc_id[k] = part.to_global(k);
            decided += 1;
            active.push(k);
        } else {
            scc_id[k] = UNDECIDED;
        }
    }

    let mut round_decided = decided;
    loop {
        // Drain the local cascade, staging one notification per edge
        // that leaves the rank.
        while let Some(k) = active.pop() {
            for &v in graph.out_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if scc_id[l] == UNDECIDED {
                        in_residual[l] -= 1;
                        if in_residual[l] == 0 {
                            scc_id[l] = part.to_global(l);
                            decided += 1;
                            round_decided += 1;
                            active.push(l);
                        }
                    }
                } else {
                    frontier.push(part.rank_of(v), Edge { u: v, v: DEC_IN });
                }
            }
            for &v in graph.in_neighbors(k) {
                if part.has_local(v) {
                    let l = part.to_local(v);
                    if scc_id[l] == UNDECIDED {
                        out_residual[l] -= 1;
                        if out_residual[l] == 0 {
                            scc_id[l] = part.to_global(l);
                            decided += 1;
                            round_decided += 1;
                            active.push(l);
                        }
                    }
                } else {
                    frontier.push(part.rank_of(v), Edge { u: v, v: DEC_OUT });
                }
            }
        }

        if comm.allreduce_sum(round_decided) == 0 {
            break;
        }
        round_decided = 0;

        frontier.comm(comm, part);
        while frontier.has_next() {
            let message = frontier.next();
            debug_assert!(part.has_local(message.u));
            let l = part.to_local(message.u);
            if scc_id[l] != UNDECIDED {
                continue;
            }

            let residual = if message.v == DEC_IN {
                &mut in_residual[l]
            } else {
                &mut out_residual[l]
            };
            *residual -= 1;

            if out_residual[l] == 0 || in_residual[l] == 0 {
                scc_id[l] = part.to_global(l);
                decided += 1;
                round_decided += 1;
                active.push(l);
            }
        }
    }

    // With the residual degrees at hand, the pivot candidate can ignore
    // edges into already decided neighbours.
    let mut candidate = DegreeCandidate::NONE;
    for k in 0..local_n {
        if scc_id[k] == UNDECIDED {
            candidate = candidate.max(DegreeCandidate {
                degree_product: (out_residual[k] * in_residual[k]) as u64,
                vertex: part.to_global(k),
            });
        }
    }

    (decided, candidate)
}
