//! nullbasis: distributed vector-space bases for operator nullspaces
//!
//! This crate stores small sets of distributed vectors that span the nullspace of a linear
//! operator (for instance the rigid-body modes of an elasticity stiffness matrix), orthonormalizes
//! them with modified Gram-Schmidt, and checks that an operator annihilates them. Vectors and
//! operators are partitioned across the workers of a communicator; every collective operation
//! takes that communicator explicitly.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use nullbasis::{DistributedVector, IndexMap, SerialComm, VectorSpaceBasis};
//!
//! let comm = SerialComm;
//! let map = Arc::new(IndexMap::new(&comm, 3, vec![]).unwrap());
//! let mut a = DistributedVector::create(map.clone(), 1).unwrap();
//! let mut b = DistributedVector::create(map, 1).unwrap();
//! a.local_form().copy_from_slice(&[1.0, 1.0, 0.0]);
//! b.local_form().copy_from_slice(&[1.0, 0.0, 0.0]);
//!
//! let mut basis = VectorSpaceBasis::new(vec![a, b]);
//! assert!(!basis.is_orthogonal(&comm, 1e-10).unwrap());
//! basis.orthonormalize(&comm, 1e-10).unwrap();
//! assert!(basis.is_orthonormal(&comm, 1e-10).unwrap());
//! ```

pub mod parallel;

pub mod basis;
pub mod config;
pub mod elasticity;
pub mod error;
pub mod index_map;
pub mod operator;
pub mod vector;

// Re-exports for convenience
pub use basis::VectorSpaceBasis;
pub use config::*;
pub use error::*;
pub use index_map::IndexMap;
pub use operator::{DistributedCsr, LinearOperator, TripletBuilder};
pub use parallel::{Comm, SerialComm, ThreadComm, UniverseComm};
pub use vector::{DistributedVector, LocalForm};
