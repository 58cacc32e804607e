use super::LuDecomposition;
use crate::dense::{DenseVector, Matrix};
use crate::error::MatrixError;
use crate::parallel::Executor;

impl LuDecomposition {
    fn check_square(&self) -> Result<usize, MatrixError> {
        let (rows, cols) = self.lu.shape();
        if rows != cols {
            return Err(MatrixError::NotSquare { rows, cols });
        }
        Ok(rows)
    }

    /// Determinant of the decomposed matrix.
    pub fn det(&self) -> Result<f64, MatrixError> {
        let n = self.check_square()?;
        Ok((0..n).fold(self.pivot_sign, |d, i| d * self.lu[(i, i)]))
    }

    /// Solve `A x = b`.
    ///
    /// A singular `A` is not detected here; the result then holds
    /// non-finite values.
    pub fn solve(&self, b: impl AsRef<[f64]>) -> Result<DenseVector, MatrixError> {
        let n = self.check_square()?;
        let b = b.as_ref();
        if b.len() != n {
            return Err(MatrixError::DimensionMismatch {
                op: "solve",
                left: self.lu.shape(),
                right: (b.len(), 1),
            });
        }
        let mut x = vec![0.0; n];
        self.substitute(b, &mut x);
        Ok(DenseVector::from_vec(x))
    }

    /// Solve `A X = B` column by column on the calling thread.
    pub fn solve_matrix(&self, b: &Matrix) -> Result<Matrix, MatrixError> {
        self.solve_matrix_with(b, &Executor::sequential())
    }

    /// Solve `A X = B` with the right-hand-side columns split across
    /// `executor`'s blocks.
    pub fn solve_matrix_with(&self, b: &Matrix, executor: &Executor) -> Result<Matrix, MatrixError> {
        let n = self.check_square()?;
        if b.rows() != n {
            return Err(MatrixError::DimensionMismatch {
                op: "solve_matrix",
                left: self.lu.shape(),
                right: b.shape(),
            });
        }
        if n == 0 {
            return Ok(Matrix::zeros(0, b.cols()));
        }

        // Columns of B become contiguous rows, one item per right-hand side.
        let columns = b.transpose();
        let mut solved = Matrix::zeros(b.cols(), n);
        executor.run_blocks_mut(b.cols(), solved.as_mut_slice(), n, |range, block| {
            for (c, x) in range.range().zip(block.chunks_exact_mut(n)) {
                self.substitute(columns.row_slice(c), x);
            }
            Ok(())
        })?;
        Ok(solved.transpose())
    }

    pub fn inverse(&self) -> Result<Matrix, MatrixError> {
        let n = self.check_square()?;
        self.solve_matrix(&Matrix::identity(n))
    }

    pub fn inverse_with(&self, executor: &Executor) -> Result<Matrix, MatrixError> {
        let n = self.check_square()?;
        self.solve_matrix_with(&Matrix::identity(n), executor)
    }

    /// Forward then back substitution of the permuted `b` into `x`.
    fn substitute(&self, b: &[f64], x: &mut [f64]) {
        let n = x.len();
        for i in 0..n {
            let row = self.lu.row_slice(i);
            let mut sum = b[self.perm[i]];
            for j in 0..i {
                sum -= row[j] * x[j];
            }
            x[i] = sum;
        }
        for i in (0..n).rev() {
            let row = self.lu.row_slice(i);
            let mut sum = x[i];
            for j in i + 1..n {
                sum -= row[j] * x[j];
            }
            x[i] = sum / row[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn a5() -> Matrix {
        Matrix::from_rows(&[
            [1.0, 5.0, 4.0, 8.0, 9.0],
            [1.0, 5.0, 7.0, 3.0, 7.0],
            [0.0, 3.0, 8.0, 5.0, 6.0],
            [3.0, 8.0, 0.0, 7.0, 0.0],
            [1.0, 9.0, 2.0, 9.0, 6.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_det() {
        assert_relative_eq!(a5().lu().unwrap().det().unwrap(), 3073.0, epsilon = 1e-9);
        assert_eq!(Matrix::identity(4).lu().unwrap().det().unwrap(), 1.0);

        let swapped = Matrix::from_rows(&[[0.0, 1.0], [1.0, 0.0]]).unwrap();
        assert_eq!(swapped.lu().unwrap().det().unwrap(), -1.0);

        let singular = Matrix::from_rows(&[[1.0, 2.0], [2.0, 4.0]]).unwrap();
        assert_eq!(singular.lu().unwrap().det().unwrap(), 0.0);
    }

    #[test]
    fn test_solve() {
        let a = a5();
        let expected = DenseVector::from_vec(vec![1.0, -2.0, 0.5, 3.0, -1.0]);
        let b = a.multiply_vector(&expected).unwrap();
        let x = a.lu().unwrap().solve(&b).unwrap();
        assert_abs_diff_eq!(x, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_shape_errors() {
        let lu = a5().lu().unwrap();
        assert!(matches!(
            lu.solve([1.0, 2.0]),
            Err(MatrixError::DimensionMismatch { op: "solve", .. })
        ));
        assert!(lu.solve_matrix(&Matrix::zeros(4, 2)).is_err());

        let wide = Matrix::zeros(2, 3).lu().unwrap();
        assert!(matches!(wide.det(), Err(MatrixError::NotSquare { rows: 2, cols: 3 })));
        assert!(wide.solve([0.0, 0.0]).is_err());
        assert!(wide.inverse().is_err());
    }

    #[test]
    fn test_inverse() {
        let a = a5();
        let inv = a.lu().unwrap().inverse().unwrap();
        assert_abs_diff_eq!(a.multiply(&inv).unwrap(), Matrix::identity(5), epsilon = 1e-12);
        assert_abs_diff_eq!(inv.multiply(&a).unwrap(), Matrix::identity(5), epsilon = 1e-12);
    }

    #[test]
    fn test_solve_matrix_parallel_matches_sequential() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut a = Matrix::random(30, 30, &mut rng);
        // Diagonally dominant keeps the system well conditioned.
        for i in 0..30 {
            a[(i, i)] += 30.0;
        }
        let b = Matrix::random(30, 11, &mut rng);
        let lu = a.lu().unwrap();

        let sequential = lu.solve_matrix(&b).unwrap();
        let executor = Executor::builder().num_threads(4).build().unwrap();
        let parallel = lu.solve_matrix_with(&b, &executor).unwrap();
        assert_eq!(parallel, sequential);
        assert_abs_diff_eq!(a.multiply(&sequential).unwrap(), b, epsilon = 1e-10);

        let inv = lu.inverse_with(&executor).unwrap();
        assert_abs_diff_eq!(a.multiply(&inv).unwrap(), Matrix::identity(30), epsilon = 1e-10);
    }

    #[test]
    fn test_singular_solve_is_not_finite() {
        let singular = Matrix::from_rows(&[[1.0, 2.0], [2.0, 4.0]]).unwrap();
        let x = singular.lu().unwrap().solve([1.0, 1.0]).unwrap();
        assert!(x.as_slice().iter().any(|v| !v.is_finite()));
    }
}
