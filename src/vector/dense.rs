use ndarray::{Array1, Array2};

use super::CellMatrix;
use crate::classify::{Adjacency, DegreeSource, Neighbours};
use crate::engine::Strategy;

/// A cell matrix stored in full.
///
/// Storage and products cost `O(n²)`. Structural queries go through
/// neighbour lists indexed alongside the matrix, so classification stays
/// linear in the number of links.
#[derive(Clone, Debug)]
pub struct DenseMatrix {
    matrix: Array2<f64>,
    /// Rows as upstream lists, columns as downstream lists.
    index: Adjacency,
}

impl DenseMatrix {
    pub fn as_array(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl CellMatrix for DenseMatrix {
    const STRATEGY: Strategy = Strategy::VectorDense;

    fn from_positions(n: usize, positions: &[(usize, usize)]) -> Self {
        let mut matrix = Array2::zeros((n, n));
        for &(row, col) in positions {
            matrix[[row, col]] = 1.0;
        }
        let index = Adjacency::new(n, positions.iter().map(|&(row, col)| (col, row)));
        Self { matrix, index }
    }

    fn mul_vec(&self, x: &Array1<f64>) -> Array1<f64> {
        self.matrix.dot(x)
    }

    fn mul_vec_transposed(&self, x: &Array1<f64>) -> Array1<f64> {
        self.matrix.t().dot(x)
    }
}

impl DegreeSource for DenseMatrix {
    fn cell_count(&self) -> usize {
        self.matrix.nrows()
    }

    fn upstream(&self, cell: usize) -> Neighbours {
        self.index.upstream(cell)
    }

    fn downstream(&self, cell: usize) -> Neighbours {
        self.index.downstream(cell)
    }

    fn in_degree(&self, cell: usize) -> usize {
        self.index.in_degree(cell)
    }

    fn out_degree(&self, cell: usize) -> usize {
        self.index.out_degree(cell)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rows_are_inputs_and_columns_outputs() {
        // 0 -> 2 <- 1
        let m = DenseMatrix::from_positions(3, &[(2, 0), (2, 1)]);
        assert_eq!(m.upstream(2).as_slice(), &[0, 1]);
        assert_eq!(m.downstream(0).as_slice(), &[2]);
        assert_eq!(m.in_degree(0), 0);

        let x = Array1::from(vec![1.0, 2.0, 4.0]);
        assert_eq!(m.mul_vec(&x).to_vec(), vec![0.0, 0.0, 3.0]);
        assert_eq!(m.mul_vec_transposed(&x).to_vec(), vec![4.0, 4.0, 0.0]);
    }

    #[test]
    fn index_matches_matrix() {
        let positions = [(1, 0), (2, 1), (3, 1), (3, 1), (0, 3)];
        let m = DenseMatrix::from_positions(4, &positions);
        for cell in 0..4 {
            let row: Vec<_> = (0..4).filter(|&c| m.as_array()[[cell, c]] != 0.0).collect();
            let col: Vec<_> = (0..4).filter(|&r| m.as_array()[[r, cell]] != 0.0).collect();
            assert_eq!(m.upstream(cell).to_vec(), row);
            assert_eq!(m.downstream(cell).to_vec(), col);
        }
        assert_eq!(m.out_degree(1), 2);
        assert_eq!(m.in_degree(3), 1);
    }
}
