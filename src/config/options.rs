//! Tolerances for basis operations.
//!
//! This module provides the `BasisOptions` struct, which collects the
//! tolerances used by `VectorSpaceBasis` so that callers can configure them
//! in one place and pass the fields to the individual checks.

/// Default tolerance for orthonormalization pruning and orthogonality checks.
pub const DEFAULT_ORTHO_TOL: f64 = 1.0e-10;

/// Default tolerance on `‖A v‖` for nullspace membership.
pub const DEFAULT_NULLSPACE_TOL: f64 = 1.0e-8;

/// Basis tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisOptions {
    /// Vectors whose norm falls below this after projection are pruned;
    /// pairwise dot products must stay below it to count as orthogonal
    pub ortho_tol: f64,

    /// Largest `‖A v‖` accepted for a nullspace vector
    pub nullspace_tol: f64,
}

impl Default for BasisOptions {
    fn default() -> Self {
        Self {
            ortho_tol: DEFAULT_ORTHO_TOL,
            nullspace_tol: DEFAULT_NULLSPACE_TOL,
        }
    }
}

impl BasisOptions {
    pub fn with_ortho_tol(mut self, tol: f64) -> Self {
        self.ortho_tol = tol;
        self
    }

    pub fn with_nullspace_tol(mut self, tol: f64) -> Self {
        self.nullspace_tol = tol;
        self
    }
}
