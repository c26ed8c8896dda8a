//! Communicators and collective operations.
//!
//! Every collective (`barrier`, `all_reduce`, the all-gathers, and anything built on them such as
//! vector dot products or operator application) must be called by all workers of the group, in the
//! same order. A worker that skips a collective leaves the others blocked forever; this is a
//! contract on the caller and is not detected.

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Sum of `x` over all workers.
    fn all_reduce(&self, x: f64) -> f64;
    /// One value per worker, in rank order.
    fn all_gather_usize(&self, x: usize) -> Vec<usize>;
    /// Concatenation of every worker's `local` slice, in rank order.
    fn all_gather_f64(&self, local: &[f64]) -> Vec<f64>;
}

pub mod serial_comm;
pub use serial_comm::SerialComm;

pub mod thread_comm;
pub use thread_comm::ThreadComm;

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

pub enum UniverseComm {
    #[cfg(feature="mpi")]
    Mpi(MpiComm),
    Threads(ThreadComm),
    Serial(SerialComm),
}

impl UniverseComm {
    /// The MPI world when built with `mpi`, a single serial worker otherwise.
    #[cfg(feature="mpi")]
    pub fn world() -> Result<Self, crate::error::NsError> {
        Ok(UniverseComm::Mpi(MpiComm::new()?))
    }
    /// The MPI world when built with `mpi`, a single serial worker otherwise.
    #[cfg(not(feature="mpi"))]
    pub fn world() -> Result<Self, crate::error::NsError> {
        Ok(UniverseComm::Serial(SerialComm))
    }
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Threads(comm) => comm.rank(),
            UniverseComm::Serial(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Threads(comm) => comm.size(),
            UniverseComm::Serial(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Threads(comm) => comm.barrier(),
            UniverseComm::Serial(comm) => comm.barrier(),
        }
    }
    fn all_reduce(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce(x),
            UniverseComm::Threads(comm) => comm.all_reduce(x),
            UniverseComm::Serial(comm) => comm.all_reduce(x),
        }
    }
    fn all_gather_usize(&self, x: usize) -> Vec<usize> {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather_usize(x),
            UniverseComm::Threads(comm) => comm.all_gather_usize(x),
            UniverseComm::Serial(comm) => comm.all_gather_usize(x),
        }
    }
    fn all_gather_f64(&self, local: &[f64]) -> Vec<f64> {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather_f64(local),
            UniverseComm::Threads(comm) => comm.all_gather_f64(local),
            UniverseComm::Serial(comm) => comm.all_gather_f64(local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature="mpi"))]
    #[test]
    fn world_is_serial_without_mpi() {
        let world = UniverseComm::world().unwrap();
        assert_eq!((world.rank(), world.size()), (0, 1));
        assert_eq!(world.all_reduce(2.5), 2.5);
        assert_eq!(world.all_gather_f64(&[1.0, 2.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn dispatches_to_thread_group() {
        let out = ThreadComm::run(2, |comm| {
            let universe = UniverseComm::Threads(comm);
            universe.barrier();
            (universe.all_gather_usize(universe.rank() + 1), universe.all_reduce(2.0))
        });
        assert_eq!(out, vec![(vec![1, 2], 4.0), (vec![1, 2], 4.0)]);
    }
}
