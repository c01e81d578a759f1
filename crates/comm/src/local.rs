//! An in-process cluster backed by one OS thread per rank.

use std::any::Any;
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;

use crate::Communicator;

/// One rank's endpoint of an in-process cluster.
///
/// [`LocalCluster::run`] spawns `P` scoped threads, hands each its own
/// endpoint and tears the session down when every rank has returned, so
/// transport cleanup happens on every exit path. A panicking rank is a
/// fatal cluster event: the panic propagates out of `run`.
///
/// Exchanges go through a mailbox of `P` slots. A collective deposits one
/// value per rank, waits for everyone, reads all slots and waits again so
/// no rank can race ahead into the next collective while a slot is still
/// being read.
pub struct LocalCluster {
    shared: Arc<Mailbox>,
    rank: usize,
}

struct Mailbox {
    size: usize,
    slots: Mutex<Vec<Option<Box<dyn Any + Send>>>>,
    barrier: Barrier,
}

impl LocalCluster {
    /// Runs `f` once per rank on `world_size` threads and returns the
    /// per-rank results in rank order.
    pub fn run<R, F>(world_size: usize, f: F) -> Vec<R>
    where
        F: Fn(&LocalCluster) -> R + Sync,
        R: Send,
    {
        assert!(world_size > 0, "a cluster needs at least one rank");

        let shared = Arc::new(Mailbox {
            size: world_size,
            slots: Mutex::new((0..world_size).map(|_| None).collect()),
            barrier: Barrier::new(world_size),
        });

        std::thread::scope(|scope| {
            let handles = (0..world_size)
                .map(|rank| {
                    let comm = LocalCluster {
                        shared: Arc::clone(&shared),
                        rank,
                    };
                    let f = &f;
                    scope.spawn(move || f(&comm))
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().expect("rank panicked"))
                .collect()
        })
    }

    fn exchange<T>(&self, value: T) -> Vec<T>
    where
        T: Clone + Send + 'static,
    {
        if self.shared.size == 1 {
            return vec![value];
        }

        self.shared.slots.lock()[self.rank] = Some(Box::new(value));
        self.shared.barrier.wait();

        let gathered = {
            let slots = self.shared.slots.lock();
            slots
                .iter()
                .map(|slot| {
                    slot.as_ref()
                        .expect("every rank deposits")
                        .downcast_ref::<T>()
                        .expect("collective type must match across ranks")
                        .clone()
                })
                .collect()
        };

        self.shared.barrier.wait();
        gathered
    }
}

impl Communicator for LocalCluster {
    fn world_rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        if self.shared.size > 1 {
            self.shared.barrier.wait();
        }
    }

    fn allgather<T>(&self, value: T) -> Vec<T>
    where
        T: Clone + Send + 'static,
    {
        self.exchange(value)
    }

    fn allgatherv<T>(&self, values: &[T]) -> Vec<T>
    where
        T: Clone + Send + 'static,
    {
        self.exchange(values.to_vec()).into_iter().flatten().collect()
    }

    fn alltoall_counts(&self, send: &[usize]) -> Vec<usize> {
        debug_assert_eq!(send.len(), self.shared.size);
        self.exchange(send.to_vec())
            .into_iter()
            .map(|row| row[self.rank])
            .collect()
    }

    fn alltoallv<T>(
        &self,
        send: &[T],
        send_counts: &[usize],
        send_displs: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
        recv_displs: &[usize],
    ) where
        T: Clone + Send + 'static,
    {
        debug_assert_eq!(send_counts.len(), self.shared.size);
        debug_assert_eq!(recv_counts.len(), self.shared.size);

        let segments = (0..self.shared.size)
            .map(|r| send[send_displs[r]..send_displs[r] + send_counts[r]].to_vec())
            .collect::<Vec<_>>();

        for (sender, segments) in self.exchange(segments).into_iter().enumerate() {
            let segment = &segments[self.rank];
            debug_assert_eq!(segment.len(), recv_counts[sender]);
            recv[recv_displs[sender]..recv_displs[sender] + recv_counts[sender]]
                .clone_from_slice(segment);
        }
    }
}
