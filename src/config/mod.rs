//! Configuration: default tolerances and the `BasisOptions` bundle.

pub mod options;
pub use options::{BasisOptions, DEFAULT_NULLSPACE_TOL, DEFAULT_ORTHO_TOL};
