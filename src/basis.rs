//! Vector-space bases for operator nullspaces.
//!
//! A `VectorSpaceBasis` holds a fixed, ordered set of distributed vectors that is meant to span the
//! nullspace of a linear operator, e.g. the rigid-body modes of an elasticity stiffness matrix. It
//! can orthonormalize the set with modified Gram-Schmidt, test orthogonality, and check that an
//! operator annihilates every vector.
//!
//! # Collectives
//! Every method that reads vector data reduces across workers and takes the communicator
//! explicitly. All workers must call the same methods in the same order. Branching inside the
//! algorithms (pruning, early exits) depends only on reduced values, so every worker takes the
//! same branch.
//!
//! # References
//! - Golub, G. H., Van Loan, C. F. (2013). Matrix Computations, 4th Edition. §5.2.8 (modified Gram-Schmidt)

use crate::error::NsError;
use crate::operator::LinearOperator;
use crate::parallel::Comm;
use crate::vector::DistributedVector;
use log::{debug, trace};
use std::ops::Index;

#[derive(Debug, Clone)]
pub struct VectorSpaceBasis {
    basis: Vec<DistributedVector>,
}

impl VectorSpaceBasis {
    /// Wraps `vectors` as a basis. Their layouts are validated on first use.
    pub fn new(vectors: Vec<DistributedVector>) -> Self {
        Self { basis: vectors }
    }

    /// Number of vectors currently in the basis.
    pub fn dim(&self) -> usize {
        self.basis.len()
    }

    pub fn get(&self, i: usize) -> Option<&DistributedVector> {
        self.basis.get(i)
    }

    pub fn vectors(&self) -> &[DistributedVector] {
        &self.basis
    }

    pub fn into_vectors(self) -> Vec<DistributedVector> {
        self.basis
    }

    fn local_layout(&self) -> Result<(), NsError> {
        if let Some((first, rest)) = self.basis.split_first() {
            for v in rest {
                first.check_layout(v)?;
            }
        }
        Ok(())
    }

    /// Layout check agreed on by all workers, so a mismatch seen by one of them fails everywhere.
    fn check_dims<C: Comm>(&self, comm: &C) -> Result<(), NsError> {
        NsError::agree(comm, self.local_layout())
    }

    /// Orthonormalizes the basis in place with modified Gram-Schmidt and returns the number of
    /// vectors removed.
    ///
    /// Vectors are processed in order; each one has its projections onto the already accepted
    /// vectors subtracted one at a time, always from the updated vector. A vector whose remaining
    /// norm is below `tol` depends linearly on its predecessors and is dropped, shrinking the basis.
    ///
    /// # Errors
    /// `DimensionMismatch` if the vectors do not share a layout; the basis is left untouched.
    pub fn orthonormalize<C: Comm>(&mut self, comm: &C, tol: f64) -> Result<usize, NsError> {
        self.check_dims(comm)?;
        let input = std::mem::take(&mut self.basis);
        let n = input.len();
        let mut retained: Vec<DistributedVector> = Vec::with_capacity(n);
        for (i, mut v) in input.into_iter().enumerate() {
            for e in &retained {
                let r = v.dot(comm, e)?;
                v.axpy(-r, e)?;
            }
            let norm = v.norm(comm);
            trace!("orthonormalize: vector {} has norm {:e} after projection", i, norm);
            if norm < tol {
                debug!("orthonormalize: dropping vector {} (norm {:e} < {:e})", i, norm, tol);
                continue;
            }
            v.scale(1.0 / norm);
            retained.push(v);
        }
        self.basis = retained;
        Ok(n - self.basis.len())
    }

    /// True if every pair of distinct vectors has `|dot| <= tol`. Norms are not checked.
    pub fn is_orthogonal<C: Comm>(&self, comm: &C, tol: f64) -> Result<bool, NsError> {
        self.check_dims(comm)?;
        for (i, vi) in self.basis.iter().enumerate() {
            for (j, vj) in self.basis.iter().enumerate().skip(i + 1) {
                let d = vi.dot(comm, vj)?;
                if d.abs() > tol {
                    trace!("is_orthogonal: dot(v{}, v{}) = {:e}", i, j, d);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// True if the basis is orthogonal and every vector has norm within `tol` of one.
    pub fn is_orthonormal<C: Comm>(&self, comm: &C, tol: f64) -> Result<bool, NsError> {
        if !self.is_orthogonal(comm, tol)? {
            return Ok(false);
        }
        for (i, v) in self.basis.iter().enumerate() {
            let norm = v.norm(comm);
            if (norm - 1.0).abs() > tol {
                trace!("is_orthonormal: |v{}| = {:e}", i, norm);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True if `‖A v‖ <= tol` for every basis vector `v`.
    ///
    /// The basis does not have to be orthonormal; scaling a vector scales `‖A v‖` with it, so the
    /// answer for a raw basis and for its orthonormalized form may differ near the tolerance.
    ///
    /// # Errors
    /// `DimensionMismatch` if the vectors do not share a layout or do not have as many entries as
    /// the operator has columns. The operator may be rectangular.
    pub fn in_nullspace<C: Comm, A: LinearOperator>(&self, comm: &C, a: &A, tol: f64) -> Result<bool, NsError> {
        self.check_dims(comm)?;
        if self.basis.is_empty() {
            return Ok(true);
        }
        let mut y = a.create_output(comm)?;
        for (i, v) in self.basis.iter().enumerate() {
            a.apply(comm, v, &mut y)?;
            let norm = y.norm(comm);
            trace!("in_nullspace: |A v{}| = {:e}", i, norm);
            if norm > tol {
                debug!("in_nullspace: vector {} is not annihilated (|A v| = {:e} > {:e})", i, norm, tol);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Removes from `x` its components along the basis vectors: `x -= dot(x, e) e` for each basis
    /// vector `e`, in order.
    ///
    /// This is the orthogonal projection onto the complement of the span only when the basis is
    /// orthonormal; call [`orthonormalize`](Self::orthonormalize) first.
    pub fn orthogonalize<C: Comm>(&self, comm: &C, x: &mut DistributedVector) -> Result<(), NsError> {
        let local = self
            .local_layout()
            .and_then(|_| self.basis.first().map_or(Ok(()), |first| first.check_layout(x)));
        NsError::agree(comm, local)?;
        for e in &self.basis {
            let r = x.dot(comm, e)?;
            x.axpy(-r, e)?;
        }
        Ok(())
    }
}

impl Index<usize> for VectorSpaceBasis {
    type Output = DistributedVector;
    fn index(&self, i: usize) -> &DistributedVector {
        &self.basis[i]
    }
}
