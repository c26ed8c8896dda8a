//! Parallel layout of a distributed index set.
//!
//! An `IndexMap` describes which contiguous range of a global index set `[0, global_size)` the
//! calling worker owns, and which additional indices owned by other workers it mirrors locally as
//! ghosts. Ranges are assigned in rank order, so rank 0 owns the first `local_size` indices.

use crate::error::NsError;
use crate::parallel::Comm;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    local_range: Range<usize>,
    global_size: usize,
    ghosts: Vec<usize>,
}

impl IndexMap {
    /// Builds the layout from this worker's owned count and ghost indices.
    ///
    /// Collective: offsets and the global size come from an all-gather of the local sizes.
    ///
    /// # Errors
    /// `AllocationError` if a ghost lies inside the owned range, is not a valid global index, or is
    /// listed twice, or if the global size overflows.
    pub fn new<C: Comm>(comm: &C, local_size: usize, ghosts: Vec<usize>) -> Result<Self, NsError> {
        let sizes = comm.all_gather_usize(local_size);
        let overflow = || NsError::AllocationError("global index set size overflows usize".into());
        let offset = sizes[..comm.rank()]
            .iter()
            .try_fold(0usize, |acc, &n| acc.checked_add(n))
            .ok_or_else(overflow)?;
        let global_size = sizes
            .iter()
            .try_fold(0usize, |acc, &n| acc.checked_add(n))
            .ok_or_else(overflow)?;
        Self::from_parts(offset..offset + local_size, global_size, ghosts)
    }

    /// Builds the layout from an already known owned range and global size. Not collective; the
    /// caller is responsible for the ranges of all workers tiling `[0, global_size)`.
    pub fn from_parts(local_range: Range<usize>, global_size: usize, ghosts: Vec<usize>) -> Result<Self, NsError> {
        if local_range.start > local_range.end || local_range.end > global_size {
            return Err(NsError::AllocationError(format!(
                "owned range {:?} does not fit in a global size of {}",
                local_range, global_size
            )));
        }
        let mut seen = ghosts.clone();
        seen.sort_unstable();
        if seen.windows(2).any(|w| w[0] == w[1]) {
            return Err(NsError::AllocationError("duplicate ghost index".into()));
        }
        if let Some(&g) = ghosts
            .iter()
            .find(|&&g| g >= global_size || local_range.contains(&g))
        {
            return Err(NsError::AllocationError(format!(
                "ghost index {} is owned locally or outside [0, {})",
                g, global_size
            )));
        }
        Ok(Self { local_range, global_size, ghosts })
    }

    /// Number of indices owned by this worker.
    pub fn local_size(&self) -> usize {
        self.local_range.len()
    }

    pub fn global_size(&self) -> usize {
        self.global_size
    }

    /// Global indices owned by this worker.
    pub fn local_range(&self) -> Range<usize> {
        self.local_range.clone()
    }

    /// Global indices of the ghost entries, in local storage order.
    pub fn ghosts(&self) -> &[usize] {
        &self.ghosts
    }

    pub fn num_ghosts(&self) -> usize {
        self.ghosts.len()
    }

    /// Local position (owned first, then ghosts) of a global index, if present on this worker.
    pub fn global_to_local(&self, global: usize) -> Option<usize> {
        if self.local_range.contains(&global) {
            Some(global - self.local_range.start)
        } else {
            self.ghosts
                .iter()
                .position(|&g| g == global)
                .map(|p| self.local_size() + p)
        }
    }

    /// Global index of a local position (owned first, then ghosts).
    pub fn local_to_global(&self, local: usize) -> Option<usize> {
        let n = self.local_size();
        if local < n {
            Some(self.local_range.start + local)
        } else {
            self.ghosts.get(local - n).copied()
        }
    }
}
