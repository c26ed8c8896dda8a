use crate::parallel::Comm;
use thiserror::Error;

// Unified error type for nullbasis

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NsError {
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("allocation error: {0}")]
    AllocationError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl NsError {
    /// Returns `Ok(())` when `expected == found`, a `DimensionMismatch` otherwise.
    pub(crate) fn check_dim(context: &'static str, expected: usize, found: usize) -> Result<(), NsError> {
        if expected == found {
            Ok(())
        } else {
            Err(NsError::DimensionMismatch { context, expected, found })
        }
    }

    /// Makes a locally detected error visible on every worker. Collective.
    ///
    /// Workers that failed get their own error back; the others get a `DimensionMismatch` whose
    /// `found` is the number of failing workers. All workers then return `Err` together, so none is
    /// left waiting in the next collective.
    pub(crate) fn agree<C: Comm>(comm: &C, local: Result<(), NsError>) -> Result<(), NsError> {
        let failed = comm.all_reduce(if local.is_ok() { 0.0 } else { 1.0 });
        match local {
            Err(e) => Err(e),
            Ok(()) if failed > 0.0 => Err(NsError::DimensionMismatch {
                context: "layout on another worker",
                expected: 0,
                found: failed as usize,
            }),
            Ok(()) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ThreadComm;

    #[test]
    fn local_failure_reaches_every_worker() {
        let out = ThreadComm::run(3, |comm| {
            let local = NsError::check_dim("block", 2, if comm.rank() == 1 { 3 } else { 2 });
            NsError::agree(&comm, local)
        });
        assert_eq!(out[1], Err(NsError::DimensionMismatch { context: "block", expected: 2, found: 3 }));
        for r in [0, 2] {
            assert!(matches!(out[r], Err(NsError::DimensionMismatch { found: 1, .. })));
        }
        assert!(ThreadComm::run(2, |comm| NsError::agree(&comm, Ok(()))).iter().all(Result::is_ok));
    }
}
