//! Rigid-body modes of linear elasticity.
//!
//! For a vector-valued displacement space with one node per index of an [`IndexMap`] and `gdim`
//! components per node (dof `node * gdim + component`, block size `gdim`), the translations and
//! infinitesimal rotations produce zero strain and span the nullspace of the stiffness matrix of a
//! free body:
//!
//! - 2D: `(1, 0)`, `(0, 1)`, `(-y, x)`
//! - 3D: `(1, 0, 0)`, `(0, 1, 0)`, `(0, 0, 1)`, `(-y, x, 0)`, `(z, 0, -x)`, `(0, -z, y)`
//!
//! These helpers only fill vectors from nodal coordinates; they do not communicate.

use crate::basis::VectorSpaceBasis;
use crate::error::NsError;
use crate::index_map::IndexMap;
use crate::vector::DistributedVector;
use std::sync::Arc;

/// Number of rigid-body modes in `gdim` dimensions.
pub fn rigid_body_mode_count(gdim: usize) -> Result<usize, NsError> {
    match gdim {
        2 => Ok(3),
        3 => Ok(6),
        _ => Err(NsError::InvalidInput(format!(
            "rigid-body modes need a geometric dimension of 2 or 3, got {}", gdim
        ))),
    }
}

/// Displacement of `mode` at point `x`.
fn mode_value(gdim: usize, mode: usize, x: &[f64; 3]) -> [f64; 3] {
    let [px, py, pz] = *x;
    match (gdim, mode) {
        (_, m) if m < gdim => {
            let mut t = [0.0; 3];
            t[m] = 1.0;
            t
        }
        (2, 2) => [-py, px, 0.0],
        (3, 3) => [-py, px, 0.0],
        (3, 4) => [pz, 0.0, -px],
        (3, 5) => [0.0, -pz, py],
        _ => [0.0; 3],
    }
}

/// Builds the rigid-body basis (not orthonormalized) for a blocked displacement layout.
///
/// `coords` holds the coordinates of every local node, owned nodes first and then ghosts, in the
/// order of `map`. Ghost entries are filled too, so the vectors are consistent without a ghost
/// update.
///
/// # Errors
/// `InvalidInput` if `gdim` is not 2 or 3 or `coords` does not have one entry per local node.
pub fn build_elastic_nullspace(
    map: Arc<IndexMap>,
    coords: &[[f64; 3]],
    gdim: usize,
) -> Result<VectorSpaceBasis, NsError> {
    let dim = rigid_body_mode_count(gdim)?;
    let nodes = map.local_size() + map.num_ghosts();
    if coords.len() != nodes {
        return Err(NsError::InvalidInput(format!(
            "expected coordinates for {} local nodes, got {}", nodes, coords.len()
        )));
    }
    let mut vectors = Vec::with_capacity(dim);
    for mode in 0..dim {
        let mut v = DistributedVector::create(Arc::clone(&map), gdim)?;
        {
            let mut local = v.local_form();
            for (node, x) in coords.iter().enumerate() {
                let u = mode_value(gdim, mode, x);
                local[node * gdim..(node + 1) * gdim].copy_from_slice(&u[..gdim]);
            }
        }
        vectors.push(v);
    }
    Ok(VectorSpaceBasis::new(vectors))
}
