//! Partitioned bidirectional CSR storage.

use log::debug;
use rayon::prelude::*;

use bsp_comm::Communicator;

use crate::frontier::Frontier;
use crate::partition::Partition;
use crate::{Edge, Error, Vertex};

/// The out- and in-edges of one rank's owned nodes, both in CSR form.
///
/// Head arrays have `local_n + 1` entries and index into flat neighbour
/// arrays holding **global** node ids, so a neighbour may live on any
/// rank. The backward side is the edge reverse of the forward side at
/// global scale: rank boundaries never truncate it.
///
/// The graph is immutable once constructed.
pub struct BidiGraphPart<P> {
    part: P,
    fw_head: Vec<usize>,
    fw_csr: Vec<Vertex>,
    bw_head: Vec<usize>,
    bw_csr: Vec<Vertex>,
}

impl<P: Partition> BidiGraphPart<P> {
    /// Builds the partitioned graph from the forward edges whose source
    /// is owned by this rank.
    ///
    /// The forward CSR is assembled locally; the backward CSR is derived
    /// by sending `(v, u)` for every local edge `u -> v` to the owner of
    /// `v` in one all-to-all round, then sorting the received reversed
    /// edges by target. Every rank must call this collectively.
    pub fn from_local_edges<C>(comm: &C, part: P, edges: &[Edge]) -> Result<Self, Error>
    where
        C: Communicator,
    {
        let n = part.n();
        let local_n = part.local_n();

        for edge in edges {
            for endpoint in [edge.u, edge.v] {
                if endpoint >= n {
                    return Err(Error::VertexOutOfBounds {
                        vertex: endpoint,
                        n,
                    });
                }
            }
            if !part.has_local(edge.u) {
                return Err(Error::ForeignSource {
                    vertex: edge.u,
                    rank: part.world_rank(),
                });
            }
        }

        let (fw_head, fw_csr) = assemble_csr(local_n, edges.iter().map(|e| (part.to_local(e.u), e.v)));

        // Reverse every local edge and route it to the target's owner.
        let mut exchange = Frontier::<Edge>::new(part.world_size(), edges.len());
        for edge in edges {
            let reversed = Edge {
                u: edge.v,
                v: edge.u,
            };
            if part.has_local(edge.v) {
                exchange.local_push(reversed);
            } else {
                exchange.push(part.rank_of(edge.v), reversed);
            }
        }
        exchange.comm(comm, &part);

        let mut reversed = Vec::new();
        while exchange.has_next() {
            let edge = exchange.next();
            debug_assert!(part.has_local(edge.u));
            reversed.push((part.to_local(edge.u), edge.v));
        }
        reversed.par_sort_unstable();

        let (bw_head, bw_csr) = assemble_csr(local_n, reversed.iter().copied());

        debug!(
            "rank {}: built graph part with {} nodes, {} out-edges, {} in-edges",
            part.world_rank(),
            local_n,
            fw_csr.len(),
            bw_csr.len()
        );

        let graph = Self {
            part,
            fw_head,
            fw_csr,
            bw_head,
            bw_csr,
        };
        debug_assert!(graph.validate().is_ok());
        Ok(graph)
    }

    /// Builds the partitioned graph from a replicated global edge list
    /// by keeping the locally owned sources. Every rank must pass the
    /// same list.
    pub fn from_global_edges<C>(comm: &C, part: P, edges: &[Edge]) -> Result<Self, Error>
    where
        C: Communicator,
    {
        let n = part.n();
        for edge in edges {
            for endpoint in [edge.u, edge.v] {
                if endpoint >= n {
                    return Err(Error::VertexOutOfBounds {
                        vertex: endpoint,
                        n,
                    });
                }
            }
        }

        let local: Vec<Edge> = edges
            .iter()
            .filter(|edge| part.has_local(edge.u))
            .copied()
            .collect();
        Self::from_local_edges(comm, part, &local)
    }

    pub fn part(&self) -> &P {
        &self.part
    }

    /// Number of out-edges of local node `k`.
    pub fn out_degree(&self, k: usize) -> usize {
        self.fw_head[k + 1] - self.fw_head[k]
    }

    /// Number of in-edges of local node `k`.
    pub fn in_degree(&self, k: usize) -> usize {
        self.bw_head[k + 1] - self.bw_head[k]
    }

    /// Global ids of the out-neighbours of local node `k`.
    pub fn out_neighbors(&self, k: usize) -> &[Vertex] {
        &self.fw_csr[self.fw_head[k]..self.fw_head[k + 1]]
    }

    /// Global ids of the in-neighbours of local node `k`.
    pub fn in_neighbors(&self, k: usize) -> &[Vertex] {
        &self.bw_csr[self.bw_head[k]..self.bw_head[k + 1]]
    }

    /// Number of locally stored forward edges.
    pub fn local_fw_m(&self) -> usize {
        self.fw_csr.len()
    }

    /// Number of locally stored backward edges.
    pub fn local_bw_m(&self) -> usize {
        self.bw_csr.len()
    }

    /// Checks the local CSR invariants: heads are prefix sums ending at
    /// the neighbour-array lengths and every neighbour id is in bounds.
    /// The global reverse property is a cross-rank invariant and is
    /// exercised by tests instead.
    pub fn validate(&self) -> Result<(), Error> {
        let local_n = self.part.local_n();
        for (head, csr) in [(&self.fw_head, &self.fw_csr), (&self.bw_head, &self.bw_csr)] {
            if head.len() != local_n + 1
                || head[0] != 0
                || head[local_n] != csr.len()
                || head.windows(2).any(|w| w[0] > w[1])
            {
                return Err(Error::InvalidHeads {
                    expected: local_n + 1,
                    actual: head.len(),
                });
            }
            if let Some(&vertex) = csr.iter().find(|&&v| v >= self.part.n()) {
                return Err(Error::VertexOutOfBounds {
                    vertex,
                    n: self.part.n(),
                });
            }
        }
        Ok(())
    }
}

/// Counting-sort assembly of a CSR from `(local source, global target)`
/// pairs.
fn assemble_csr(
    local_n: usize,
    edges: impl Iterator<Item = (usize, Vertex)> + Clone,
) -> (Vec<usize>, Vec<Vertex>) {
    let mut head = vec![0_usize; local_n + 1];
    for (k, _) in edges.clone() {
        head[k + 1] += 1;
    }
    for k in 0..local_n {
        head[k + 1] += head[k];
    }

    let mut csr = vec![0; head[local_n]];
    let mut cursor = head.clone();
    for (k, v) in edges {
        csr[cursor[k]] = v;
        cursor[k] += 1;
    }

    (head, csr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{BalancedSlice, Cyclic, TrivialSlice};
    use bsp_comm::{LocalCluster, SingleProcess};

    fn edges(list: &[(Vertex, Vertex)]) -> Vec<Edge> {
        list.iter().copied().map(Edge::from).collect()
    }

    #[test]
    fn single_rank_degrees_and_neighbors() {
        let comm = SingleProcess;
        let part = TrivialSlice::new(4, 0, 1);
        let graph = BidiGraphPart::from_global_edges(
            &comm,
            part,
            &edges(&[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]),
        )
        .unwrap();

        assert_eq!(graph.local_fw_m(), 5);
        assert_eq!(graph.local_bw_m(), 5);
        assert_eq!(graph.out_degree(0), 2);
        assert_eq!(graph.in_degree(0), 0);
        assert_eq!(graph.out_neighbors(1), &[2, 3]);
        assert_eq!(graph.in_neighbors(3), &[1, 2]);
    }

    #[test]
    fn rejects_out_of_bounds_edges() {
        let comm = SingleProcess;
        let part = TrivialSlice::new(3, 0, 1);

        let result = BidiGraphPart::from_global_edges(&comm, part, &edges(&[(0, 3)]));

        assert!(matches!(
            result,
            Err(Error::VertexOutOfBounds { vertex: 3, n: 3 })
        ));
    }

    #[test]
    fn rejects_foreign_sources() {
        use crate::partition::ExplicitSortedContinuous;

        let comm = SingleProcess;
        // Rank 0 owns [0, 2) of four nodes; node 3 is foreign, and the
        // check fires before any exchange is attempted.
        let part = ExplicitSortedContinuous::new(vec![2, 4], 0).unwrap();

        let result = BidiGraphPart::from_local_edges(&comm, part, &edges(&[(3, 0)]));

        assert!(matches!(
            result,
            Err(Error::ForeignSource { vertex: 3, rank: 0 })
        ));
    }

    #[test]
    fn backward_is_global_reverse_under_cyclic_partition() {
        let list = [
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

        let results = LocalCluster::run(3, |comm| {
            let part = Cyclic::new(7, comm.world_rank(), comm.world_size());
            let graph = BidiGraphPart::from_global_edges(comm, part, &edges(&list)).unwrap();

            let mut backward = Vec::new();
            for k in 0..graph.part().local_n() {
                let v = graph.part().to_global(k);
                for &u in graph.in_neighbors(k) {
                    backward.push((u, v));
                }
            }
            backward
        });

        let mut collected: Vec<(Vertex, Vertex)> = results.into_iter().flatten().collect();
        collected.sort_unstable();

        let mut expected = list.to_vec();
        expected.sort_unstable();
        assert_eq!(collected, expected);
    }

    #[test]
    fn forward_rebuilt_from_backward_is_original() {
        let list = [(0, 1), (1, 2), (2, 0), (2, 3), (3, 3), (0, 3)];

        let results = LocalCluster::run(2, |comm| {
            let part = BalancedSlice::new(4, comm.world_rank(), comm.world_size());
            let graph = BidiGraphPart::from_global_edges(comm, part, &edges(&list)).unwrap();

            // Feed the backward edges (v -> u reversed again) through a
            // second construction; its forward side must be the original
            // graph's forward side.
            let mut reversed = Vec::new();
            for k in 0..graph.part().local_n() {
                let v = graph.part().to_global(k);
                for &u in graph.in_neighbors(k) {
                    reversed.push(Edge { u: v, v: u });
                }
            }
            let part = BalancedSlice::new(4, comm.world_rank(), comm.world_size());
            let rebuilt = BidiGraphPart::from_local_edges(comm, part, &reversed).unwrap();

            let mut forward = Vec::new();
            for k in 0..rebuilt.part().local_n() {
                let u = rebuilt.part().to_global(k);
                for &v in rebuilt.in_neighbors(k) {
                    forward.push((u, v));
                }
            }
            forward
        });

        let mut collected: Vec<(Vertex, Vertex)> = results.into_iter().flatten().collect();
        collected.sort_unstable();

        let mut expected = list.to_vec();
        expected.sort_unstable();
        assert_eq!(collected, expected);
    }

    #[test]
    fn empty_graph_has_empty_parts() {
        let comm = SingleProcess;
        let part = TrivialSlice::new(0, 0, 1);
        let graph = BidiGraphPart::from_global_edges(&comm, part, &[]).unwrap();

        assert_eq!(graph.part().local_n(), 0);
        assert_eq!(graph.local_fw_m(), 0);
        assert_eq!(graph.local_bw_m(), 0);
        assert!(graph.validate().is_ok());
    }
}
