use ndarray::Array1;
use sprs::{CsMat, TriMat};

use super::CellMatrix;
use crate::classify::{DegreeSource, Neighbours};
use crate::engine::Strategy;

/// A cell matrix in compressed sparse form.
///
/// Both the row-major and column-major layouts are kept, so inputs and
/// outputs of a cell are found in time proportional to their number.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    /// Compressed sparse rows.
    rows: CsMat<f64>,
    /// Compressed sparse columns.
    cols: CsMat<f64>,
}

impl SparseMatrix {
    /// The number of stored entries.
    pub fn nnz(&self) -> usize {
        self.rows.nnz()
    }
}

impl CellMatrix for SparseMatrix {
    const STRATEGY: Strategy = Strategy::VectorSparse;

    fn from_positions(n: usize, positions: &[(usize, usize)]) -> Self {
        let mut triplets = TriMat::with_capacity((n, n), positions.len());
        for &(row, col) in positions {
            triplets.add_triplet(row, col, 1.0);
        }
        Self {
            rows: triplets.to_csr(),
            cols: triplets.to_csc(),
        }
    }

    fn mul_vec(&self, x: &Array1<f64>) -> Array1<f64> {
        multiply(&self.rows, x)
    }

    fn mul_vec_transposed(&self, x: &Array1<f64>) -> Array1<f64> {
        // The columns of `M` are the rows of `Mᵀ`
        multiply(&self.cols, x)
    }
}

impl DegreeSource for SparseMatrix {
    fn cell_count(&self) -> usize {
        self.rows.rows()
    }

    fn upstream(&self, cell: usize) -> Neighbours {
        sorted_indices(&self.rows, cell)
    }

    fn downstream(&self, cell: usize) -> Neighbours {
        sorted_indices(&self.cols, cell)
    }

    fn in_degree(&self, cell: usize) -> usize {
        self.rows.outer_view(cell).map_or(0, |row| row.nnz())
    }

    fn out_degree(&self, cell: usize) -> usize {
        self.cols.outer_view(cell).map_or(0, |col| col.nnz())
    }
}

/// Multiplies each outer vector of a compressed matrix with `x`.
fn multiply(matrix: &CsMat<f64>, x: &Array1<f64>) -> Array1<f64> {
    matrix
        .outer_iterator()
        .map(|outer| outer.iter().fold(0.0, |acc, (i, &v)| acc + v * x[i]))
        .collect()
}

fn sorted_indices(matrix: &CsMat<f64>, outer: usize) -> Neighbours {
    let mut indices: Neighbours = matrix
        .outer_view(outer)
        .map(|view| view.indices().iter().copied().collect())
        .unwrap_or_default();
    indices.sort_unstable();
    indices
}
