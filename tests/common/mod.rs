//! Shared fixtures for the integration tests: structured simplex meshes, a contiguous node
//! partition with ghosts, and P1 assembly of the isotropic linear elasticity stiffness matrix
//! `a(u, v) = ∫ σ(u) : ∇v dx` with `σ(w) = 2μ ε(w) + λ tr(ε(w)) I`.

#![allow(dead_code)]

use faer::Mat;
use nullbasis::{Comm, DistributedCsr, DistributedVector, IndexMap, TripletBuilder, VectorSpaceBasis};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Mesh {
    pub gdim: usize,
    pub coords: Vec<[f64; 3]>,
    pub cells: Vec<Vec<usize>>,
}

/// `[0,1]^2` split into `nx x ny` squares, each cut into two triangles.
pub fn unit_square(nx: usize, ny: usize) -> Mesh {
    let node = |i: usize, j: usize| j * (nx + 1) + i;
    let mut coords = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            coords.push([i as f64 / nx as f64, j as f64 / ny as f64, 0.0]);
        }
    }
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let (v0, v1, v2, v3) = (node(i, j), node(i + 1, j), node(i, j + 1), node(i + 1, j + 1));
            cells.push(vec![v0, v1, v3]);
            cells.push(vec![v0, v3, v2]);
        }
    }
    Mesh { gdim: 2, coords, cells }
}

/// Box spanned by corners `p0` and `p1`, `n[0] x n[1] x n[2]` hexahedra, each cut into six
/// tetrahedra (Kuhn subdivision, conforming across faces).
pub fn box_mesh(p0: [f64; 3], p1: [f64; 3], n: [usize; 3]) -> Mesh {
    let node = |i: usize, j: usize, k: usize| (k * (n[1] + 1) + j) * (n[0] + 1) + i;
    let mut coords = Vec::new();
    for k in 0..=n[2] {
        for j in 0..=n[1] {
            for i in 0..=n[0] {
                let t = [i as f64 / n[0] as f64, j as f64 / n[1] as f64, k as f64 / n[2] as f64];
                coords.push([
                    p0[0] + (p1[0] - p0[0]) * t[0],
                    p0[1] + (p1[1] - p0[1]) * t[1],
                    p0[2] + (p1[2] - p0[2]) * t[2],
                ]);
            }
        }
    }
    const PERMUTATIONS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    let mut cells = Vec::new();
    for k in 0..n[2] {
        for j in 0..n[1] {
            for i in 0..n[0] {
                for perm in PERMUTATIONS {
                    let mut corner = [i, j, k];
                    let mut tet = vec![node(i, j, k)];
                    for axis in perm {
                        corner[axis] += 1;
                        tet.push(node(corner[0], corner[1], corner[2]));
                    }
                    cells.push(tet);
                }
            }
        }
    }
    Mesh { gdim: 3, coords, cells }
}

/// This worker's share of the mesh nodes.
pub struct Partition {
    pub map: Arc<IndexMap>,
    /// Coordinates of owned nodes followed by ghost nodes.
    pub coords: Vec<[f64; 3]>,
}

/// Contiguous node blocks in rank order; ghosts are the non-owned nodes of cells touching an
/// owned node.
pub fn partition<C: Comm>(comm: &C, mesh: &Mesh) -> Partition {
    let n = mesh.coords.len();
    let (size, rank) = (comm.size(), comm.rank());
    let chunk = |r: usize| n / size + usize::from(r < n % size);
    let start: usize = (0..rank).map(chunk).sum();
    let owned = start..start + chunk(rank);
    let mut ghosts = BTreeSet::new();
    for cell in &mesh.cells {
        if cell.iter().any(|v| owned.contains(v)) {
            ghosts.extend(cell.iter().copied().filter(|v| !owned.contains(v)));
        }
    }
    let ghosts: Vec<usize> = ghosts.into_iter().collect();
    let map = Arc::new(IndexMap::new(comm, owned.len(), ghosts.clone()).unwrap());
    assert_eq!(map.local_range(), owned);
    let coords = owned
        .clone()
        .chain(ghosts)
        .map(|v| mesh.coords[v])
        .collect();
    Partition { map, coords }
}

/// Gradients of the P1 basis functions on a simplex and its volume.
fn p1_gradients(x: &[[f64; 3]], gdim: usize) -> (Vec<[f64; 3]>, f64) {
    let edge = |k: usize| [x[k][0] - x[0][0], x[k][1] - x[0][1], x[k][2] - x[0][2]];
    // Rows of the inverse Jacobian are the gradients of φ_1..φ_d.
    let (rows, volume) = if gdim == 2 {
        let (a, b) = (edge(1), edge(2));
        let det = a[0] * b[1] - a[1] * b[0];
        (
            vec![[b[1] / det, -b[0] / det, 0.0], [-a[1] / det, a[0] / det, 0.0]],
            det.abs() / 2.0,
        )
    } else {
        let (a, b, c) = (edge(1), edge(2), edge(3));
        let cross = |u: [f64; 3], v: [f64; 3]| {
            [u[1] * v[2] - u[2] * v[1], u[2] * v[0] - u[0] * v[2], u[0] * v[1] - u[1] * v[0]]
        };
        let bc = cross(b, c);
        let det = a[0] * bc[0] + a[1] * bc[1] + a[2] * bc[2];
        let scale = |u: [f64; 3]| [u[0] / det, u[1] / det, u[2] / det];
        (vec![scale(bc), scale(cross(c, a)), scale(cross(a, b))], det.abs() / 6.0)
    };
    let mut grads = Vec::with_capacity(gdim + 1);
    let mut g0 = [0.0; 3];
    for r in &rows {
        for d in 0..3 {
            g0[d] -= r[d];
        }
    }
    grads.push(g0);
    grads.extend(rows);
    (grads, volume)
}

/// Element stiffness of the isotropic elasticity form on a P1 simplex.
fn element_stiffness(x: &[[f64; 3]], gdim: usize, mu: f64, lmbda: f64) -> Mat<f64> {
    let (g, vol) = p1_gradients(x, gdim);
    let nv = gdim + 1;
    Mat::from_fn(nv * gdim, nv * gdim, |r, s| {
        let (a, i) = (r / gdim, r % gdim);
        let (b, j) = (s / gdim, s % gdim);
        let gab: f64 = (0..gdim).map(|d| g[a][d] * g[b][d]).sum();
        let delta = if i == j { gab } else { 0.0 };
        vol * (mu * (delta + g[a][j] * g[b][i]) + lmbda * g[a][i] * g[b][j])
    })
}

/// Rows of the elasticity stiffness matrix owned by this worker (no boundary conditions).
pub fn assemble_elasticity(mesh: &Mesh, part: &Partition, e: f64, nu: f64) -> DistributedCsr {
    let gdim = mesh.gdim;
    let mu = e / (2.0 * (1.0 + nu));
    let lmbda = e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
    let layout = DistributedVector::create(Arc::clone(&part.map), gdim).unwrap();
    let mut builder = TripletBuilder::square_for(&layout);
    let owned = part.map.local_range();
    for cell in &mesh.cells {
        if !cell.iter().any(|v| owned.contains(v)) {
            continue;
        }
        let x: Vec<[f64; 3]> = cell.iter().map(|&v| mesh.coords[v]).collect();
        let ke = element_stiffness(&x, gdim, mu, lmbda);
        let dofs: Vec<usize> = cell
            .iter()
            .flat_map(|&v| (0..gdim).map(move |c| v * gdim + c))
            .collect();
        builder.add_block(&dofs, &ke);
    }
    builder.build().unwrap()
}

/// Two translations and the in-plane rotation, plus `(0, y, 0)`, which is a stretch and not a
/// rigid-body mode.
pub fn build_broken_elastic_nullspace(part: &Partition, gdim: usize) -> VectorSpaceBasis {
    let modes: [fn(&[f64; 3]) -> [f64; 3]; 4] = [
        |_| [1.0, 0.0, 0.0],
        |_| [0.0, 1.0, 0.0],
        |x| [-x[1], x[0], 0.0],
        |x| [0.0, x[1], 0.0],
    ];
    let vectors = modes
        .iter()
        .map(|mode| {
            let mut v = DistributedVector::create(Arc::clone(&part.map), gdim).unwrap();
            {
                let mut local = v.local_form();
                for (node, x) in part.coords.iter().enumerate() {
                    local[node * gdim..(node + 1) * gdim].copy_from_slice(&mode(x)[..gdim]);
                }
            }
            v
        })
        .collect();
    VectorSpaceBasis::new(vectors)
}

/// Concatenation of the owned entries of `v` over all workers.
pub fn gather<C: Comm>(comm: &C, v: &DistributedVector) -> Vec<f64> {
    comm.all_gather_f64(v.owned())
}
