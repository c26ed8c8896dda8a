//! In-process SPMD communicator.
//!
//! `ThreadComm` runs a fixed group of workers, one OS thread each, that meet at a shared barrier for
//! every collective. It gives the same lockstep semantics as an MPI communicator without an MPI
//! runtime, which makes multi-worker partitions (owned ranges, ghost entries, row-distributed
//! operators) testable in an ordinary `cargo test`.
//!
//! # Example
//! ```
//! use nullbasis::parallel::{Comm, ThreadComm};
//! let sums = ThreadComm::run(3, |comm| comm.all_reduce(comm.rank() as f64));
//! assert_eq!(sums, vec![3.0, 3.0, 3.0]);
//! ```

use parking_lot::Mutex;
use std::sync::{Arc, Barrier};

struct Shared {
    size: usize,
    barrier: Barrier,
    f64_slots: Mutex<Vec<Vec<f64>>>,
    usize_slots: Mutex<Vec<usize>>,
}

/// Handle of one worker inside a thread group.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Creates the handles of a group of `size` workers, indexed by rank.
    ///
    /// Each handle must be driven by its own thread; calling a collective on two handles of the
    /// same group from one thread deadlocks.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a thread group needs at least one worker");
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            f64_slots: Mutex::new(vec![Vec::new(); size]),
            usize_slots: Mutex::new(vec![0; size]),
        });
        (0..size)
            .map(|rank| ThreadComm { rank, shared: Arc::clone(&shared) })
            .collect()
    }

    /// Runs `f` on `size` scoped worker threads and returns the results in rank order.
    ///
    /// A panic on any worker is re-raised on the calling thread once all workers have ended.
    pub fn run<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let group = Self::group(size);
        std::thread::scope(|s| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    s.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}

impl super::Comm for ThreadComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.shared.size }
    fn barrier(&self) {
        self.shared.barrier.wait();
    }
    fn all_reduce(&self, x: f64) -> f64 {
        // Summed in rank order so every worker gets a bitwise identical result.
        self.all_gather_f64(&[x]).iter().sum()
    }
    fn all_gather_usize(&self, x: usize) -> Vec<usize> {
        self.shared.usize_slots.lock()[self.rank] = x;
        self.shared.barrier.wait();
        let out = self.shared.usize_slots.lock().clone();
        // Nobody may overwrite a slot before everyone has read it.
        self.shared.barrier.wait();
        out
    }
    fn all_gather_f64(&self, local: &[f64]) -> Vec<f64> {
        {
            let mut slots = self.shared.f64_slots.lock();
            slots[self.rank].clear();
            slots[self.rank].extend_from_slice(local);
        }
        self.shared.barrier.wait();
        let out = self.shared.f64_slots.lock().concat();
        self.shared.barrier.wait();
        out
    }
}
