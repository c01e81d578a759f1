//! Collective operations for bulk-synchronous message-passing algorithms.
//!
//! A computation runs on `P` ranks. Each rank owns a [`Communicator`]
//! endpoint and alternates between local compute phases and collective
//! exchanges; the collectives are the only suspension points. All ranks
//! must issue the same sequence of collective calls — a rank that skips
//! one deadlocks the whole group.
//!
//! Two transports are provided:
//!
//! - [`SingleProcess`], the `P = 1` reference where every collective is
//!   the identity. Algorithms validated against it must behave the same
//!   under any other transport.
//! - [`LocalCluster`], an in-process cluster that runs one OS thread per
//!   rank and exchanges through a shared mailbox. It exists so that
//!   multi-rank behaviour can be exercised in ordinary unit tests.
//!
//! Reductions with custom operators are expressed through [`Ord`]: the
//! maximum of a tuple-like type with lexicographic ordering is exactly a
//! commutative user-defined max operator.

pub mod local;
pub mod single;

pub use crate::local::LocalCluster;
pub use crate::single::SingleProcess;

/// One rank's endpoint into a group of `P` ranks.
///
/// The generic collectives carry `Clone + Send + 'static` payloads so
/// that transports may move values between threads.
pub trait Communicator {
    /// This rank's id in `[0, world_size)`.
    fn world_rank(&self) -> usize;

    /// The number of ranks in the group.
    fn world_size(&self) -> usize;

    /// Blocks until every rank has entered the barrier.
    fn barrier(&self);

    /// Every rank contributes one value and receives all `P` values in
    /// rank order.
    fn allgather<T>(&self, value: T) -> Vec<T>
    where
        T: Clone + Send + 'static;

    /// Every rank contributes a variable-length slice; all ranks receive
    /// the concatenation in rank order.
    fn allgatherv<T>(&self, values: &[T]) -> Vec<T>
    where
        T: Clone + Send + 'static;

    /// Personalised count exchange: `send[r]` goes to rank `r`; the
    /// result holds one count received from every rank.
    fn alltoall_counts(&self, send: &[usize]) -> Vec<usize>;

    /// Personalised data exchange. `send[send_displs[r]..][..send_counts[r]]`
    /// is delivered to rank `r`; the segment from rank `s` is written to
    /// `recv[recv_displs[s]..][..recv_counts[s]]`. All slices are indexed
    /// per rank and must have `world_size` entries.
    fn alltoallv<T>(
        &self,
        send: &[T],
        send_counts: &[usize],
        send_displs: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
        recv_displs: &[usize],
    ) where
        T: Clone + Send + 'static;

    /// Global sum over one `u64` per rank.
    fn allreduce_sum(&self, value: u64) -> u64 {
        self.allgather(value).into_iter().sum()
    }

    /// Global minimum over one `u64` per rank.
    fn allreduce_min(&self, value: u64) -> u64 {
        self.allgather(value).into_iter().min().expect("world is not empty")
    }

    /// Global maximum under the type's `Ord`. Lexicographically ordered
    /// pair types turn this into a user-defined commutative reduction.
    fn allreduce_max<T>(&self, value: T) -> T
    where
        T: Clone + Ord + Send + 'static,
    {
        self.allgather(value).into_iter().max().expect("world is not empty")
    }
}

/// Writes exclusive prefix sums of `counts` into `displs` and returns the
/// total. `displs[r]` is then the offset of rank `r`'s segment in a dense
/// per-rank buffer.
pub fn displacements(counts: &[usize], displs: &mut [usize]) -> usize {
    debug_assert_eq!(counts.len(), displs.len());
    let mut total = 0;
    for (displ, &count) in displs.iter_mut().zip(counts) {
        *displ = total;
        total += count;
    }
    total
}
