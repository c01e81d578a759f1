//! Rank assignments of the global node set.
//!
//! A partition maps every global node id to exactly one owning rank and
//! gives each rank an ordered enumeration of its owned nodes. Algorithms
//! are generic over the concrete variant so that ownership tests compile
//! down to arithmetic in their inner loops.

use std::sync::Arc;

use bsp_comm::Communicator;

use crate::{Error, Vertex};

/// The ownership contract shared by all partition variants.
///
/// Invariants: every node in `[0, n)` is owned by exactly one rank;
/// `to_global(to_local(u)) == u` on the owning rank; `to_global` is a
/// bijection between `[0, local_n)` and the owned node set.
///
/// Calling [`Partition::to_local`] for a node that is not locally owned
/// is a contract violation: it panics in debug builds and returns an
/// unspecified value in release builds.
pub trait Partition {
    /// Number of nodes in the global graph.
    fn n(&self) -> u64;

    /// This rank's id.
    fn world_rank(&self) -> usize;

    /// Number of ranks the node set is split across.
    fn world_size(&self) -> usize;

    /// Number of locally owned nodes.
    fn local_n(&self) -> usize;

    /// The rank owning global node `u`.
    fn rank_of(&self, u: Vertex) -> usize;

    /// Whether `u` is owned by this rank.
    fn has_local(&self, u: Vertex) -> bool {
        self.rank_of(u) == self.world_rank()
    }

    /// The local index of the locally owned node `u`.
    fn to_local(&self, u: Vertex) -> usize;

    /// The global id of local node `k < local_n`.
    fn to_global(&self, k: usize) -> Vertex;
}

/// Continuous partitions own the half-open global range `[begin, end)`,
/// with `local_n == end - begin`. Their `to_global` is monotone in the
/// local index, which loaders exploit to slice CSR files cheaply.
pub trait ContinuousPartition: Partition {
    fn begin(&self) -> Vertex;

    fn end(&self) -> Vertex;
}

/// Contiguous blocks of `ceil(n / P)` nodes; the last rank may be short.
#[derive(Clone, Copy, Debug)]
pub struct TrivialSlice {
    n: u64,
    chunk: u64,
    world_rank: usize,
    world_size: usize,
}

impl TrivialSlice {
    pub fn new(n: u64, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        let p = world_size as u64;
        let chunk = ((n + p - 1) / p).max(1);
        Self {
            n,
            chunk,
            world_rank,
            world_size,
        }
    }
}

impl Partition for TrivialSlice {
    fn n(&self) -> u64 {
        self.n
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn local_n(&self) -> usize {
        (self.end() - self.begin()) as usize
    }

    fn rank_of(&self, u: Vertex) -> usize {
        debug_assert!(u < self.n);
        (u / self.chunk) as usize
    }

    fn to_local(&self, u: Vertex) -> usize {
        debug_assert!(self.has_local(u));
        (u - self.begin()) as usize
    }

    fn to_global(&self, k: usize) -> Vertex {
        debug_assert!(k < self.local_n());
        self.begin() + k as u64
    }
}

impl ContinuousPartition for TrivialSlice {
    fn begin(&self) -> Vertex {
        (self.world_rank as u64 * self.chunk).min(self.n)
    }

    fn end(&self) -> Vertex {
        ((self.world_rank as u64 + 1) * self.chunk).min(self.n)
    }
}

/// Contiguous blocks of `ceil(n / P)` or `floor(n / P)` nodes, so that
/// rank sizes differ by at most one. The first `n mod P` ranks carry the
/// larger blocks.
#[derive(Clone, Copy, Debug)]
pub struct BalancedSlice {
    n: u64,
    world_rank: usize,
    world_size: usize,
}

impl BalancedSlice {
    pub fn new(n: u64, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        Self {
            n,
            world_rank,
            world_size,
        }
    }

    fn small(&self) -> u64 {
        self.n / self.world_size as u64
    }

    fn big_count(&self) -> u64 {
        self.n % self.world_size as u64
    }

    fn begin_of(&self, rank: u64) -> u64 {
        let big = self.small() + 1;
        if rank < self.big_count() {
            rank * big
        } else {
            self.big_count() * big + (rank - self.big_count()) * self.small()
        }
    }
}

impl Partition for BalancedSlice {
    fn n(&self) -> u64 {
        self.n
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn local_n(&self) -> usize {
        (self.end() - self.begin()) as usize
    }

    fn rank_of(&self, u: Vertex) -> usize {
        debug_assert!(u < self.n);
        let big = self.small() + 1;
        let big_region = self.big_count() * big;
        if u < big_region {
            (u / big) as usize
        } else {
            (self.big_count() + (u - big_region) / self.small().max(1)) as usize
        }
    }

    fn to_local(&self, u: Vertex) -> usize {
        debug_assert!(self.has_local(u));
        (u - self.begin()) as usize
    }

    fn to_global(&self, k: usize) -> Vertex {
        debug_assert!(k < self.local_n());
        self.begin() + k as u64
    }
}

impl ContinuousPartition for BalancedSlice {
    fn begin(&self) -> Vertex {
        self.begin_of(self.world_rank as u64)
    }

    fn end(&self) -> Vertex {
        self.begin_of(self.world_rank as u64 + 1)
    }
}

/// Round-robin ownership: node `u` lives on rank `u mod P` at local
/// index `u div P`.
#[derive(Clone, Copy, Debug)]
pub struct Cyclic {
    n: u64,
    world_rank: usize,
    world_size: usize,
}

impl Cyclic {
    pub fn new(n: u64, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        Self {
            n,
            world_rank,
            world_size,
        }
    }
}

impl Partition for Cyclic {
    fn n(&self) -> u64 {
        self.n
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn local_n(&self) -> usize {
        let p = self.world_size as u64;
        ((self.n + p - 1 - self.world_rank as u64) / p) as usize
    }

    fn rank_of(&self, u: Vertex) -> usize {
        debug_assert!(u < self.n);
        (u % self.world_size as u64) as usize
    }

    fn to_local(&self, u: Vertex) -> usize {
        debug_assert!(self.has_local(u));
        (u / self.world_size as u64) as usize
    }

    fn to_global(&self, k: usize) -> Vertex {
        debug_assert!(k < self.local_n());
        k as u64 * self.world_size as u64 + self.world_rank as u64
    }
}

/// Fixed-size blocks distributed round-robin. Degenerates to [`Cyclic`]
/// for a block size of one and to [`TrivialSlice`]-like ownership for
/// block sizes of `ceil(n / P)` and beyond.
#[derive(Clone, Copy, Debug)]
pub struct BlockCyclic {
    n: u64,
    block: u64,
    local_n: usize,
    world_rank: usize,
    world_size: usize,
}

impl BlockCyclic {
    pub fn new(n: u64, block: u64, world_rank: usize, world_size: usize) -> Self {
        debug_assert!(world_rank < world_size);
        debug_assert!(block > 0);

        let p = world_size as u64;
        let r = world_rank as u64;
        let full_blocks = n / block;
        let tail = n % block;

        let full_owned = (full_blocks + p - 1 - r) / p;
        let mut local_n = full_owned * block;
        if tail > 0 && full_blocks % p == r {
            local_n += tail;
        }

        Self {
            n,
            block,
            local_n: local_n as usize,
            world_rank,
            world_size,
        }
    }
}

impl Partition for BlockCyclic {
    fn n(&self) -> u64 {
        self.n
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn local_n(&self) -> usize {
        self.local_n
    }

    fn rank_of(&self, u: Vertex) -> usize {
        debug_assert!(u < self.n);
        ((u / self.block) % self.world_size as u64) as usize
    }

    fn to_local(&self, u: Vertex) -> usize {
        debug_assert!(self.has_local(u));
        let local_block = (u / self.block) / self.world_size as u64;
        (local_block * self.block + u % self.block) as usize
    }

    fn to_global(&self, k: usize) -> Vertex {
        debug_assert!(k < self.local_n());
        let k = k as u64;
        let global_block = (k / self.block) * self.world_size as u64 + self.world_rank as u64;
        global_block * self.block + k % self.block
    }
}

/// Explicit contiguous ranges with globally known boundaries. Only the
/// exclusive `end` of every rank is replicated; rank lookup is a binary
/// search over the sorted boundary array.
#[derive(Clone, Debug)]
pub struct ExplicitSortedContinuous {
    ends: Arc<[u64]>,
    world_rank: usize,
}

impl ExplicitSortedContinuous {
    /// Builds the partition from the exclusive upper boundary of every
    /// rank. `ends` must be non-decreasing with `ends[P - 1] == n`.
    pub fn new(ends: Vec<u64>, world_rank: usize) -> Result<Self, Error> {
        if ends.is_empty() || world_rank >= ends.len() || ends.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidPartitioning);
        }
        Ok(Self {
            ends: ends.into(),
            world_rank,
        })
    }

    /// Builds the boundary array by gathering every rank's `end`.
    pub fn from_local_end<C: Communicator>(comm: &C, end: u64) -> Result<Self, Error> {
        Self::new(comm.allgather(end), comm.world_rank())
    }
}

impl Partition for ExplicitSortedContinuous {
    fn n(&self) -> u64 {
        *self.ends.last().expect("at least one rank")
    }

    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn world_size(&self) -> usize {
        self.ends.len()
    }

    fn local_n(&self) -> usize {
        (self.end() - self.begin()) as usize
    }

    fn rank_of(&self, u: Vertex) -> usize {
        debug_assert!(u < self.n());
        self.ends.partition_point(|&end| end <= u)
    }

    fn to_local(&self, u: Vertex) -> usize {
        debug_assert!(self.has_local(u));
        (u - self.begin()) as usize
    }

    fn to_global(&self, k: usize) -> Vertex {
        debug_assert!(k < self.local_n());
        self.begin() + k as u64
    }
}

impl ContinuousPartition for ExplicitSortedContinuous {
    fn begin(&self) -> Vertex {
        if self.world_rank == 0 {
            0
        } else {
            self.ends[self.world_rank - 1]
        }
    }

    fn end(&self) -> Vertex {
        self.ends[self.world_rank]
    }
}
