//! Bulk-synchronous work queues with all-to-all exchange.
//!
//! A [`Frontier`] buffers work items for one BSP round: items for local
//! nodes go straight into the receive buffer, items for remote nodes are
//! staged per destination rank in the send buffer. [`Frontier::comm`]
//! runs one exchange round and doubles as the global convergence test —
//! it returns `false` exactly when no rank has anything left to send.
//!
//! Consumption is stack-ordered. Reachability and label propagation are
//! commutative over their work items, so no FIFO guarantee is needed and
//! none is given; items pushed after an exchange belong to the next
//! round.

use bsp_comm::{displacements, Communicator};

use crate::partition::Partition;
use crate::{Edge, Vertex};

/// A routable work item: anything that can name the rank that must
/// process it.
pub trait FrontierItem: Copy + Default + Send + 'static {
    /// The rank owning this item's destination node.
    fn owner<P: Partition>(&self, part: &P) -> usize;
}

impl FrontierItem for Vertex {
    fn owner<P: Partition>(&self, part: &P) -> usize {
        part.rank_of(*self)
    }
}

impl FrontierItem for Edge {
    fn owner<P: Partition>(&self, part: &P) -> usize {
        part.rank_of(self.u)
    }
}

/// A two-sided queue of work items pending either local consumption or
/// delivery to their owning rank.
pub struct Frontier<T> {
    send: Vec<T>,
    recv: Vec<T>,
    send_counts: Vec<usize>,
    send_displs: Vec<usize>,
    recv_counts: Vec<usize>,
    recv_displs: Vec<usize>,
}

impl<T: FrontierItem> Frontier<T> {
    /// Creates a frontier for a group of `world_size` ranks. `capacity`
    /// is reserved on both buffers up front; the usual choice is the
    /// number of locally owned nodes, remote spill grows on demand.
    pub fn new(world_size: usize, capacity: usize) -> Self {
        Self {
            send: Vec::with_capacity(capacity),
            recv: Vec::with_capacity(capacity),
            send_counts: vec![0; world_size],
            send_displs: vec![0; world_size],
            recv_counts: vec![0; world_size],
            recv_displs: vec![0; world_size],
        }
    }

    /// Stages `item` for delivery to `rank` in the next exchange.
    pub fn push(&mut self, rank: usize, item: T) {
        debug_assert!(rank < self.send_counts.len());
        self.send.push(item);
        self.send_counts[rank] += 1;
    }

    /// Enqueues `item` for this rank without waiting for an exchange.
    pub fn local_push(&mut self, item: T) {
        self.recv.push(item);
    }

    /// Whether unprocessed items are queued for this rank.
    pub fn has_next(&self) -> bool {
        !self.recv.is_empty()
    }

    /// Pops the next queued item. Calling this on an empty frontier is a
    /// contract violation.
    pub fn next(&mut self) -> T {
        debug_assert!(self.has_next(), "next() on a drained frontier");
        self.recv.pop().expect("frontier is drained")
    }

    /// Number of items staged for remote delivery.
    pub fn send_len(&self) -> usize {
        self.send.len()
    }

    /// Drops all buffered items and counts.
    pub fn clear(&mut self) {
        self.send.clear();
        self.recv.clear();
        self.send_counts.fill(0);
    }

    /// Runs one BSP exchange round.
    ///
    /// Returns `false` without exchanging anything when the staged send
    /// count is zero on every rank — the global convergence signal.
    /// Otherwise delivers every staged item to its owner's receive
    /// buffer and returns `true`. Items pushed by other ranks before
    /// their call to `comm` are visible after it returns; later pushes
    /// belong to the next round.
    pub fn comm<C, P>(&mut self, comm: &C, part: &P) -> bool
    where
        C: Communicator,
        P: Partition,
    {
        let send_total = displacements(&self.send_counts, &mut self.send_displs);
        debug_assert_eq!(send_total, self.send.len());

        if comm.allreduce_sum(send_total as u64) == 0 {
            return false;
        }

        self.recv_counts = comm.alltoall_counts(&self.send_counts);
        let recv_total = displacements(&self.recv_counts, &mut self.recv_displs);

        partition_by_rank(&mut self.send, &self.send_counts, &mut self.send_displs, |item| {
            item.owner(part)
        });

        let tail = self.recv.len();
        self.recv.resize(tail + recv_total, T::default());
        comm.alltoallv(
            &self.send,
            &self.send_counts,
            &self.send_displs,
            &mut self.recv[tail..],
            &self.recv_counts,
            &self.recv_displs,
        );

        self.send.clear();
        self.send_counts.fill(0);
        true
    }
}

/// Reorders `items` in place so that items destined for the same rank
/// are contiguous and in rank order, without allocating per-destination
/// lists.
///
/// `counts[r]` must hold the number of items for rank `r`; on return
/// `displs[r]` holds the offset of rank `r`'s bucket. The kernel walks
/// the buckets in rank order, using `displs` as bucket cursors: an item
/// already in its home bucket is skipped, anything else is swapped to
/// the next free slot of its destination bucket. Earlier buckets are
/// complete when a later one starts, so every item moves at most once.
pub fn partition_by_rank<T>(
    items: &mut [T],
    counts: &[usize],
    displs: &mut [usize],
    rank_of: impl Fn(&T) -> usize,
) {
    debug_assert_eq!(counts.len(), displs.len());
    debug_assert_eq!(counts.iter().sum::<usize>(), items.len());

    let total = displacements(counts, displs);
    debug_assert_eq!(total, items.len());

    let mut ordered = 0;
    for rank in 0..counts.len() {
        let bucket_begin = ordered;
        let bucket_end = bucket_begin + counts[rank];

        // Slots before the cursor were filled by swaps from earlier
        // buckets; restore the bucket start for the caller.
        ordered = displs[rank];
        displs[rank] = bucket_begin;

        while ordered < bucket_end {
            let target = rank_of(&items[ordered]);
            debug_assert!(target >= rank, "earlier buckets are already complete");
            debug_assert!(target < counts.len());

            if target == rank {
                ordered += 1;
            } else {
                items.swap(ordered, displs[target]);
                displs[target] += 1;
            }
        }
    }
}
