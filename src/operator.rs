//! Linear operators acting on distributed vectors.
//!
//! [`LinearOperator`] is the narrow contract the basis needs from a matrix: its global shape and a
//! collective product `y = A x`. Two implementations are provided:
//!
//! - [`DistributedCsr`]: each worker stores the rows matching the owned range of its output vector,
//!   with global column indices, as a faer CSR matrix. Built with [`TripletBuilder`].
//! - `faer::Mat<f64>`: a dense matrix replicated on every worker; each worker computes its own rows.
//!
//! Both gather the input vector onto every worker before the local product, which is simple and
//! exact but sends the full vector; it is meant for operators of moderate size.

use crate::error::NsError;
use crate::index_map::IndexMap;
use crate::parallel::Comm;
use crate::vector::DistributedVector;
use faer::Mat;
use faer::sparse::{SparseRowMat, SymbolicSparseRowMat};
use std::ops::Range;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A linear map between distributed vectors.
pub trait LinearOperator {
    /// Global `(rows, cols)`.
    fn shape(&self) -> (usize, usize);
    /// Compute `y = A x`. Collective.
    ///
    /// # Errors
    /// `DimensionMismatch` if `x` does not have `cols` entries, `y` does not have `rows` entries,
    /// or the owned block of `y` does not match the rows stored on some worker. Every worker gets
    /// the error.
    fn apply<C: Comm>(&self, comm: &C, x: &DistributedVector, y: &mut DistributedVector) -> Result<(), NsError>;
    /// A zero vector with `rows` entries laid out the way `apply` expects `y`. Collective.
    fn create_output<C: Comm>(&self, comm: &C) -> Result<DistributedVector, NsError>;
}

/// Gathers `x` onto every worker after checking the global shapes.
///
/// The global checks give the same answer on every worker, so on error nobody enters the gather.
fn gather_input<C: Comm>(
    comm: &C,
    shape: (usize, usize),
    x: &DistributedVector,
    y: &DistributedVector,
) -> Result<Vec<f64>, NsError> {
    NsError::check_dim("operator columns", shape.1, x.global_size())?;
    NsError::check_dim("operator rows", shape.0, y.global_size())?;
    let full = comm.all_gather_f64(x.owned());
    NsError::check_dim("gathered input", shape.1, full.len())?;
    Ok(full)
}

/// Row block of a distributed sparse matrix in CSR format.
pub struct DistributedCsr {
    inner: SparseRowMat<usize, f64>,
    row_range: Range<usize>,
    nrows: usize,
}

impl DistributedCsr {
    /// Build the row block `row_range` of an `nrows x ncols` matrix from raw row-ptr, col-idx and
    /// values, with column indices sorted and unique within each row.
    pub fn from_csr(
        row_range: Range<usize>,
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, NsError> {
        if row_range.end > nrows {
            return Err(NsError::InvalidInput(format!(
                "row block {:?} exceeds {} rows", row_range, nrows
            )));
        }
        let local_rows = row_range.len();
        NsError::check_dim("csr row pointer", local_rows + 1, row_ptr.len())?;
        NsError::check_dim("csr values", col_idx.len(), values.len())?;
        if row_ptr[0] != 0 || row_ptr.windows(2).any(|w| w[0] > w[1]) || row_ptr[local_rows] != col_idx.len() {
            return Err(NsError::InvalidInput("csr row pointer is not monotone".into()));
        }
        for i in 0..local_rows {
            let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            if cols.windows(2).any(|w| w[0] >= w[1]) || cols.iter().any(|&c| c >= ncols) {
                return Err(NsError::InvalidInput(format!(
                    "csr row {} has unsorted or out of range column indices", row_range.start + i
                )));
            }
        }
        let symbolic = SymbolicSparseRowMat::new_checked(local_rows, ncols, row_ptr, None, col_idx);
        let inner = SparseRowMat::new(symbolic, values);
        Ok(Self { inner, row_range, nrows })
    }

    /// Global rows stored on this worker.
    pub fn row_range(&self) -> Range<usize> {
        self.row_range.clone()
    }

    /// Number of stored entries on this worker.
    pub fn nnz(&self) -> usize {
        self.inner.as_ref().val().len()
    }

    /// Stored value at global `(row, col)`, or zero. Only rows of this worker are visible.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if !self.row_range.contains(&row) {
            return None;
        }
        let a = self.inner.as_ref();
        let row_ptr = a.symbolic().row_ptr();
        let col_idx = a.symbolic().col_idx();
        let i = row - self.row_range.start;
        let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
        Some(match cols.binary_search(&col) {
            Ok(k) => a.val()[row_ptr[i] + k],
            Err(_) => 0.0,
        })
    }

    fn local_spmv(&self, x: &[f64], y: &mut [f64]) {
        let a = self.inner.as_ref();
        let row_ptr = a.symbolic().row_ptr();
        let col_idx = a.symbolic().col_idx();
        let val = a.val();
        let row = |i: usize| -> f64 {
            (row_ptr[i]..row_ptr[i + 1])
                .map(|k| val[k] * x[col_idx[k]])
                .sum()
        };
        #[cfg(feature = "rayon")]
        {
            y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = row(i));
        }
        #[cfg(not(feature = "rayon"))]
        {
            y.iter_mut().enumerate().for_each(|(i, yi)| *yi = row(i));
        }
    }
}

impl LinearOperator for DistributedCsr {
    fn shape(&self) -> (usize, usize) {
        (self.nrows, self.inner.ncols())
    }

    fn apply<C: Comm>(&self, comm: &C, x: &DistributedVector, y: &mut DistributedVector) -> Result<(), NsError> {
        let full = gather_input(comm, self.shape(), x, y)?;
        let block = NsError::check_dim("operator row block start", self.row_range.start, y.local_range().start)
            .and_then(|_| NsError::check_dim("operator row block", self.row_range.len(), y.local_size()));
        NsError::agree(comm, block)?;
        self.local_spmv(&full, y.owned_mut());
        Ok(())
    }

    /// # Errors
    /// `InvalidInput` on every worker if the row blocks do not tile `[0, rows)` in rank order.
    fn create_output<C: Comm>(&self, comm: &C) -> Result<DistributedVector, NsError> {
        let starts = comm.all_gather_usize(self.row_range.start);
        let ends = comm.all_gather_usize(self.row_range.end);
        let tiled = starts.first() == Some(&0)
            && ends.last() == Some(&self.nrows)
            && starts.iter().skip(1).zip(&ends).all(|(s, e)| s == e);
        if !tiled {
            return Err(NsError::InvalidInput(format!(
                "row blocks {:?} do not tile {} rows",
                starts.iter().zip(&ends).map(|(s, e)| *s..*e).collect::<Vec<_>>(),
                self.nrows
            )));
        }
        let map = IndexMap::from_parts(self.row_range.clone(), self.nrows, Vec::new())?;
        DistributedVector::create(Arc::new(map), 1)
    }
}

/// Dense matrix replicated on every worker.
impl LinearOperator for Mat<f64> {
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn apply<C: Comm>(&self, comm: &C, x: &DistributedVector, y: &mut DistributedVector) -> Result<(), NsError> {
        let full = gather_input(comm, self.shape(), x, y)?;
        let offset = y.local_range().start;
        for (k, yk) in y.owned_mut().iter_mut().enumerate() {
            let i = offset + k;
            *yk = (0..self.ncols()).map(|j| self[(i, j)] * full[j]).sum();
        }
        Ok(())
    }

    /// Rows split into contiguous blocks as evenly as possible, lower ranks taking the remainder.
    fn create_output<C: Comm>(&self, comm: &C) -> Result<DistributedVector, NsError> {
        let (rows, size, rank) = (self.nrows(), comm.size(), comm.rank());
        let local = rows / size + usize::from(rank < rows % size);
        let map = IndexMap::new(comm, local, Vec::new())?;
        DistributedVector::create(Arc::new(map), 1)
    }
}

/// Builder for the row block of a distributed CSR matrix from (row, col, value) triplets.
///
/// Each worker assembles the rows it owns; triplets for other rows are dropped. Duplicates are
/// summed when the matrix is built.
pub struct TripletBuilder {
    row_range: Range<usize>,
    nrows: usize,
    ncols: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl TripletBuilder {
    pub fn new(row_range: Range<usize>, nrows: usize, ncols: usize) -> Self {
        Self { row_range, nrows, ncols, entries: Vec::new() }
    }

    /// A square operator whose rows and columns follow the layout of `v`.
    pub fn square_for(v: &DistributedVector) -> Self {
        Self::new(v.local_range(), v.global_size(), v.global_size())
    }

    /// Adds `value` at global `(row, col)` if `row` is owned here.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if self.row_range.contains(&row) {
            self.entries.push((row, col, value));
        }
    }

    /// Adds a dense element matrix at the given global indices.
    pub fn add_block(&mut self, indices: &[usize], block: &Mat<f64>) {
        debug_assert_eq!(block.nrows(), indices.len());
        debug_assert_eq!(block.ncols(), indices.len());
        for (a, &row) in indices.iter().enumerate() {
            for (b, &col) in indices.iter().enumerate() {
                self.add(row, col, block[(a, b)]);
            }
        }
    }

    /// Number of stored triplets, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compresses the triplets into CSR, summing duplicates.
    ///
    /// # Errors
    /// `InvalidInput` if a column index is out of range.
    pub fn build(mut self) -> Result<DistributedCsr, NsError> {
        if let Some(&(r, c, _)) = self.entries.iter().find(|e| e.1 >= self.ncols) {
            return Err(NsError::InvalidInput(format!(
                "entry ({}, {}) outside {} columns", r, c, self.ncols
            )));
        }
        self.entries.sort_unstable_by_key(|&(r, c, _)| (r, c));
        let local_rows = self.row_range.len();
        let mut row_ptr = vec![0usize; local_rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(self.entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(self.entries.len());
        let mut last: Option<(usize, usize)> = None;
        for &(r, c, v) in &self.entries {
            if last == Some((r, c)) {
                if let Some(acc) = values.last_mut() {
                    *acc += v;
                }
                continue;
            }
            last = Some((r, c));
            col_idx.push(c);
            values.push(v);
            row_ptr[r - self.row_range.start + 1] += 1;
        }
        for i in 0..local_rows {
            row_ptr[i + 1] += row_ptr[i];
        }
        DistributedCsr::from_csr(self.row_range, self.nrows, self.ncols, row_ptr, col_idx, values)
    }
}
