//! Distributed dense vectors.
//!
//! A `DistributedVector` stores the entries of one worker: the owned block of the global vector
//! followed by ghost entries mirrored from other workers. The layout is given by a shared
//! [`IndexMap`] and a block size `bs`, so index `i` of the map corresponds to the `bs` consecutive
//! vector entries `i*bs .. (i+1)*bs`.
//!
//! Reductions (`dot`, `norm`) read owned entries only and are collective: they take the
//! communicator explicitly and must be called by every worker of the group. Local updates
//! (`axpy`, `scale`, `set`) touch the whole local buffer, ghosts included, and never communicate.
//!
//! With the `rayon` feature the local kernels run on rayon parallel iterators.

use crate::error::NsError;
use crate::index_map::IndexMap;
use crate::parallel::Comm;
use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct DistributedVector {
    map: Arc<IndexMap>,
    bs: usize,
    data: Vec<f64>,
}

/// Exclusive view of a vector's local buffer: owned entries first, then ghosts.
///
/// The view borrows the vector mutably, so it has to be dropped before the vector can take part in
/// a collective operation.
pub struct LocalForm<'a> {
    data: &'a mut [f64],
    owned: usize,
}

impl LocalForm<'_> {
    pub fn owned_mut(&mut self) -> &mut [f64] {
        &mut self.data[..self.owned]
    }

    pub fn ghosts_mut(&mut self) -> &mut [f64] {
        &mut self.data[self.owned..]
    }
}

impl Deref for LocalForm<'_> {
    type Target = [f64];
    fn deref(&self) -> &[f64] {
        &*self.data
    }
}

impl DerefMut for LocalForm<'_> {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut *self.data
    }
}

impl DistributedVector {
    /// Allocates a zero vector with `block_size` entries per index of `map`.
    ///
    /// # Errors
    /// `AllocationError` if `block_size` is zero or the sizes overflow.
    pub fn create(map: Arc<IndexMap>, block_size: usize) -> Result<Self, NsError> {
        if block_size == 0 {
            return Err(NsError::AllocationError("block size must be positive".into()));
        }
        let local = (map.local_size() + map.num_ghosts())
            .checked_mul(block_size)
            .ok_or_else(|| NsError::AllocationError("local vector size overflows usize".into()))?;
        map.global_size()
            .checked_mul(block_size)
            .ok_or_else(|| NsError::AllocationError("global vector size overflows usize".into()))?;
        Ok(Self { map, bs: block_size, data: vec![0.0; local] })
    }

    /// A zero vector with the same layout.
    pub fn duplicate(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
            bs: self.bs,
            data: vec![0.0; self.data.len()],
        }
    }

    pub fn index_map(&self) -> &Arc<IndexMap> {
        &self.map
    }

    pub fn block_size(&self) -> usize {
        self.bs
    }

    pub fn global_size(&self) -> usize {
        self.map.global_size() * self.bs
    }

    /// Number of owned entries.
    pub fn local_size(&self) -> usize {
        self.map.local_size() * self.bs
    }

    /// Global positions of the owned entries.
    pub fn local_range(&self) -> Range<usize> {
        let r = self.map.local_range();
        r.start * self.bs..r.end * self.bs
    }

    pub fn owned(&self) -> &[f64] {
        &self.data[..self.local_size()]
    }

    pub fn owned_mut(&mut self) -> &mut [f64] {
        let n = self.local_size();
        &mut self.data[..n]
    }

    pub fn ghosts(&self) -> &[f64] {
        &self.data[self.local_size()..]
    }

    /// Owned entries followed by ghost entries.
    pub fn local(&self) -> &[f64] {
        &self.data
    }

    /// Scoped mutable access to the local buffer. No ghost update happens on release.
    pub fn local_form(&mut self) -> LocalForm<'_> {
        let owned = self.local_size();
        LocalForm { data: &mut self.data, owned }
    }

    /// Sets every local entry, ghosts included, to `value`.
    pub fn set(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Copies the local buffer of `other`, which must have the same layout.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), NsError> {
        self.check_layout(other)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Global inner product over owned entries. Collective.
    ///
    /// # Errors
    /// `DimensionMismatch` on every worker if the global sizes or the owned blocks differ on any
    /// worker.
    pub fn dot<C: Comm>(&self, comm: &C, other: &Self) -> Result<f64, NsError> {
        let local = NsError::check_dim("dot: global size", self.global_size(), other.global_size())
            .and_then(|_| NsError::check_dim("dot: local size", self.local_size(), other.local_size()));
        NsError::agree(comm, local)?;
        Ok(comm.all_reduce(local_dot(self.owned(), other.owned())))
    }

    /// Euclidean norm over owned entries. Collective.
    pub fn norm<C: Comm>(&self, comm: &C) -> f64 {
        let owned = self.owned();
        comm.all_reduce(local_dot(owned, owned)).sqrt()
    }

    /// `self += alpha * other` on the local buffer.
    pub fn axpy(&mut self, alpha: f64, other: &Self) -> Result<(), NsError> {
        self.check_layout(other)?;
        #[cfg(feature = "rayon")]
        {
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .for_each(|(y, &x)| *y += alpha * x);
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.data
                .iter_mut()
                .zip(other.data.iter())
                .for_each(|(y, &x)| *y += alpha * x);
        }
        Ok(())
    }

    /// `self *= alpha` on the local buffer.
    pub fn scale(&mut self, alpha: f64) {
        #[cfg(feature = "rayon")]
        {
            self.data.par_iter_mut().for_each(|y| *y *= alpha);
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.data.iter_mut().for_each(|y| *y *= alpha);
        }
    }

    /// `DimensionMismatch` unless `other` has the same global size, owned block and ghost count.
    pub(crate) fn check_layout(&self, other: &Self) -> Result<(), NsError> {
        NsError::check_dim("vector global size", self.global_size(), other.global_size())?;
        NsError::check_dim("vector local size", self.local_size(), other.local_size())?;
        NsError::check_dim("vector ghost size", self.data.len(), other.data.len())
    }
}

fn local_dot(x: &[f64], y: &[f64]) -> f64 {
    #[cfg(feature = "rayon")]
    {
        x.par_iter()
            .zip(y.par_iter())
            .map(|(xi, yi)| xi * yi)
            .sum()
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().zip(y.iter()).map(|(xi, yi)| xi * yi).sum()
    }
}
