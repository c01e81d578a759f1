//! A building block for distributed graph algorithms.
//!
//! A directed graph with `n` nodes and `m` edges is split across the `P`
//! ranks of a message-passing group. Each rank owns a subset of the nodes
//! (described by a [`Partition`]) and stores the out- and in-edges of its
//! owned nodes in Compressed-Sparse-Row form (a [`BidiGraphPart`]).
//! Neighbour entries are global node ids and may refer to nodes owned by
//! other ranks; cross-rank traversal goes through a [`Frontier`], a
//! bulk-synchronous send/receive queue with built-in convergence
//! detection.
//!
//! # Building a partitioned graph
//!
//! ```
//! use bsp_comm::SingleProcess;
//! use graph_part::prelude::*;
//!
//! let comm = SingleProcess;
//! let part = TrivialSlice::new(4, comm.world_rank(), comm.world_size());
//! let graph = BidiGraphPart::from_global_edges(
//!     &comm,
//!     part,
//!     &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)].map(Edge::from),
//! )
//! .unwrap();
//!
//! assert_eq!(graph.part().n(), 4);
//! assert_eq!(graph.out_degree(1), 2);
//! assert_eq!(graph.in_degree(1), 1);
//! assert_eq!(graph.out_neighbors(1), &[2, 3]);
//! assert_eq!(graph.in_neighbors(1), &[0]);
//! ```

pub mod frontier;
pub mod graph;
pub mod partition;
pub mod prelude;

pub use crate::frontier::{partition_by_rank, Frontier, FrontierItem};
pub use crate::graph::BidiGraphPart;
pub use crate::partition::{
    BalancedSlice, BlockCyclic, ContinuousPartition, Cyclic, ExplicitSortedContinuous, Partition,
    TrivialSlice,
};

use thiserror::Error;

/// A global node identifier in `[0, n)`.
pub type Vertex = u64;

/// A directed edge from `u` to `v`.
///
/// The same layout doubles as a routed two-word message: frontier items
/// of type `Edge` are delivered to the owner of `u`, with `v` carrying
/// the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub u: Vertex,
    pub v: Vertex,
}

impl From<(Vertex, Vertex)> for Edge {
    fn from((u, v): (Vertex, Vertex)) -> Self {
        Edge { u, v }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("node {vertex} out of bounds for graph of {n} nodes")]
    VertexOutOfBounds { vertex: Vertex, n: u64 },
    #[error("edge source {vertex} is not owned by rank {rank}")]
    ForeignSource { vertex: Vertex, rank: usize },
    #[error("invalid partitioning")]
    InvalidPartitioning,
    #[error("head array is not a prefix-sum of length {expected}, got {actual}")]
    InvalidHeads { expected: usize, actual: usize },
}
