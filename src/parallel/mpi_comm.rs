//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
//! backend for distributed-memory parallelism. Each MPI process is one worker of the group; the
//! collectives map onto `MPI_Allreduce`, `MPI_Allgather` and `MPI_Allgatherv` on the world
//! communicator. The implementation is only available when the `mpi` feature is enabled.
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use nullbasis::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().unwrap();
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! comm.barrier();
//! # }
//! ```

use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::error::NsError;

/// MPI communicator wrapper for distributed parallelism.
///
/// Owns the MPI environment: MPI is finalized when this value is dropped.
pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// Fails with `Unsupported` if MPI has already been initialized in this process.
    pub fn new() -> Result<Self, NsError> {
        let universe = mpi::initialize().ok_or(NsError::Unsupported("MPI is already initialized"))?;
        let world    = universe.world();
        let rank     = world.rank() as usize;
        let size     = world.size() as usize;
        Ok(MpiComm { world, rank, size, _universe: universe })
    }
}

impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize { self.rank }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize { self.size }
    /// Synchronizes all processes at a barrier.
    fn barrier(&self) { self.world.barrier(); }

    /// Performs an all-reduce sum operation across all processes.
    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }

    /// Gathers one count from every process onto every process.
    fn all_gather_usize(&self, x: usize) -> Vec<usize> {
        let mut recv = vec![0u64; self.size];
        self.world.all_gather_into(&(x as u64), &mut recv[..]);
        recv.into_iter().map(|v| v as usize).collect()
    }

    /// Gathers variable-length slices from every process onto every process.
    fn all_gather_f64(&self, local: &[f64]) -> Vec<f64> {
        let counts: Vec<i32> = self
            .all_gather_usize(local.len())
            .into_iter()
            .map(|c| c as i32)
            .collect();
        let displs: Vec<i32> = counts
            .iter()
            .scan(0, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect();
        let total = counts.iter().map(|&c| c as usize).sum();
        let mut out = vec![0.0f64; total];
        {
            let mut partition = PartitionMut::new(&mut out[..], counts, &displs[..]);
            self.world.all_gather_varcount_into(local, &mut partition);
        }
        out
    }
}
