//! Distributed strongly connected components.
//!
//! The engine assigns every node of a directed graph to the smallest
//! node id of its strongly connected component. The graph is split
//! across the ranks of a message-passing group as a
//! [`BidiGraphPart`](graph_part::BidiGraphPart); each rank sees only the
//! edges of its owned nodes and all cross-rank traversal goes through
//! bulk-synchronous [`Frontier`](graph_part::Frontier) exchanges.
//!
//! The pipeline follows the forward-backward-trim family of parallel
//! SCC algorithms [1]: trivial components are trimmed in one sweep, the
//! component of a high-degree pivot is carved out by a forward and a
//! backward reachability search [2], and the leftover small components
//! are finished by iterated min-label propagation [3] with a local
//! Tarjan pass [4] for residual pieces that do not cross rank borders.
//!
//! [1] Lisa K. Fleischer, Bruce Hendrickson, Ali Pınar:
//! "On Identifying Strongly Connected Components in Parallel",
//! Parallel and Distributed Processing, IPDPS Workshops 2000
//! [2] Sungpack Hong, Nicole C. Rodia, Kunle Olukotun:
//! "On Fast Parallel Detection of Strongly Connected Components (SCC)
//! in Small-World Graphs", SC 2013
//! [3] George M. Slota, Sivasankaran Rajamanickam, Kamesh Madduri:
//! "BFS and Coloring-based Parallel Algorithms for Strongly Connected
//! Components and Related Problems", IPDPS 2014
//! [4] Robert Tarjan:
//! "Depth-First Search and Linear Graph Algorithms",
//! SIAM Journal on Computing, 1972

pub mod coloring;
pub mod fwbw;
pub mod pipeline;
pub mod pivot;
pub mod prelude;
pub mod tarjan;
pub mod trim;

pub use crate::pipeline::{scc, SccConfig};
pub use crate::pivot::DegreeCandidate;

use graph_part::Vertex;

/// Sentinel for a node whose component has not been decided yet.
///
/// A decided cell holds the smallest global node id of the component
/// and is never written again.
pub const UNDECIDED: Vertex = Vertex::MAX;
