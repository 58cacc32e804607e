//! # Dense matrices
//!
//! [`Matrix`] is a rectangular row-major store of `f64` with bounds-checked
//! access. Rows can be borrowed without copying through [`RowView`] and
//! [`RowViewMut`]; a mutable view writes straight into the matrix. Columns
//! are borrowed read-only through the strided [`ColumnView`].
//!
//! Operations prefixed with `mutable_` (and `set`, `zero_out`, `swap_rows`)
//! change the matrix in place and take `&mut self`. Everything else takes
//! `&self` and allocates its result. Clone first if a routine that works in
//! place must not touch the original.

use std::ops::{Index, IndexMut};

use approx::{AbsDiffEq, RelativeEq};
use ndarray::{Array2, ArrayView2};
use num_traits::ToPrimitive;
use rand::Rng;

use crate::error::MatrixError;

mod ops;
mod vector;

pub use vector::{ColumnView, DenseVector, RowView, RowViewMut};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Number of elements of a `rows x cols` matrix.
fn checked_len(rows: usize, cols: usize) -> Result<usize, MatrixError> {
    rows.checked_mul(cols).ok_or(MatrixError::ShapeOverflow { rows, cols })
}

fn len_or_panic(rows: usize, cols: usize) -> usize {
    checked_len(rows, cols).unwrap_or_else(|e| panic!("{}", e))
}

impl Matrix {
    /// # Panics
    /// Panics if `rows * cols` overflows `usize`.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; len_or_panic(rows, cols)],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Wrap `data`, laid out row by row.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, MatrixError> {
        let expected = checked_len(rows, cols)?;
        if data.len() != expected {
            return Err(MatrixError::InvalidData {
                expected,
                got: data.len(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Build a matrix from equally long rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(checked_len(rows.len(), cols)?);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MatrixError::InvalidData {
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Pack row-major values of any primitive numeric type, e.g. feature
    /// values handed over by a data loader.
    pub fn from_values<T: ToPrimitive>(
        rows: usize,
        cols: usize,
        values: &[T],
    ) -> Result<Self, MatrixError> {
        let expected = checked_len(rows, cols)?;
        if values.len() != expected {
            return Err(MatrixError::InvalidData {
                expected,
                got: values.len(),
            });
        }
        let data = values
            .iter()
            .enumerate()
            .map(|(index, v)| v.to_f64().ok_or(MatrixError::Conversion { index }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Matrix { rows, cols, data })
    }

    /// Matrix with entries drawn uniformly from `[0, 1)`.
    ///
    /// # Panics
    /// Panics if `rows * cols` overflows `usize`.
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let data = (0..len_or_panic(rows, cols)).map(|_| rng.random::<f64>()).collect();
        Matrix { rows, cols, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Result<usize, MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::IndexOutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64, MatrixError> {
        Ok(self.data[self.offset(row, col)?])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        let idx = self.offset(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<(), MatrixError> {
        if row >= self.rows {
            return Err(MatrixError::IndexOutOfBounds {
                row,
                col: 0,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    pub fn row_view(&self, row: usize) -> Result<RowView<'_>, MatrixError> {
        self.check_row(row)?;
        Ok(RowView::new(row, self.row_slice(row)))
    }

    pub fn row_view_mut(&mut self, row: usize) -> Result<RowViewMut<'_>, MatrixError> {
        self.check_row(row)?;
        let cols = self.cols;
        Ok(RowViewMut::new(
            row,
            &mut self.data[row * cols..(row + 1) * cols],
        ))
    }

    fn check_col(&self, col: usize) -> Result<(), MatrixError> {
        if col >= self.cols {
            return Err(MatrixError::IndexOutOfBounds {
                row: 0,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    /// Borrowed view of column `col`; no data is copied.
    pub fn column_view(&self, col: usize) -> Result<ColumnView<'_>, MatrixError> {
        self.check_col(col)?;
        Ok(ColumnView::new(col, self.rows, self.cols, &self.data))
    }

    /// Owned copy of column `col`. Use [`column_view`](Self::column_view)
    /// to read it in place.
    pub fn column(&self, col: usize) -> Result<DenseVector, MatrixError> {
        Ok(self.column_view(col)?.to_vector())
    }

    #[inline]
    pub(crate) fn row_slice(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// The backing store, row by row.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn zero_out(&mut self) {
        self.data.fill(0.0);
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<(), MatrixError> {
        self.check_row(a)?;
        self.check_row(b)?;
        swap_row_slices(&mut self.data, self.cols, a, b);
        Ok(())
    }

    /// New `cols x rows` matrix with `(j, i) = self(i, j)`.
    pub fn transpose(&self) -> Matrix {
        let mut t = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            let row = self.row_slice(i);
            for (j, &v) in row.iter().enumerate() {
                t.data[j * self.rows + i] = v;
            }
        }
        t
    }

    pub fn to_ndarray(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows, self.cols), |(i, j)| {
            self.data[i * self.cols + j]
        })
    }
}

pub(crate) fn swap_row_slices(data: &mut [f64], cols: usize, a: usize, b: usize) {
    if a == b {
        return;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = data.split_at_mut(hi * cols);
    head[lo * cols..(lo + 1) * cols].swap_with_slice(&mut tail[..cols]);
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    /// # Panics
    /// Panics when the index is out of bounds; use [`Matrix::get`] to get an
    /// error instead.
    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.rows,
            self.cols
        );
        &mut self.data[row * self.cols + col]
    }
}

impl From<ArrayView2<'_, f64>> for Matrix {
    fn from(view: ArrayView2<'_, f64>) -> Self {
        let (rows, cols) = view.dim();
        Matrix {
            rows,
            cols,
            data: view.iter().copied().collect(),
        }
    }
}

impl From<&Array2<f64>> for Matrix {
    fn from(array: &Array2<f64>) -> Self {
        Matrix::from(array.view())
    }
}

impl AbsDiffEq for Matrix {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Matrix {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample() -> Matrix {
        Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_get_set() {
        let mut m = sample();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.get(1, 2).unwrap(), 6.0);

        m.set(0, 1, -7.0).unwrap();
        assert_eq!(m.get(0, 1).unwrap(), -7.0);
        assert_eq!(m[(0, 1)], -7.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut m = sample();
        assert!(matches!(
            m.get(2, 0),
            Err(MatrixError::IndexOutOfBounds { row: 2, col: 0, rows: 2, cols: 3 })
        ));
        assert!(m.get(0, 3).is_err());
        assert!(m.set(5, 5, 1.0).is_err());
        assert!(m.row_view(2).is_err());
        assert!(m.column(3).is_err());
        assert!(m.column_view(3).is_err());
        assert!(m.swap_rows(0, 2).is_err());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_panics() {
        let m = sample();
        let _ = m[(0, 3)];
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(
            Matrix::from_vec(2, 2, vec![1.0; 3]),
            Err(MatrixError::InvalidData { expected: 4, got: 3 })
        ));
        let ragged: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(Matrix::from_rows(&ragged).is_err());

        let id = Matrix::identity(3);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(id[(i, j)], if i == j { 1.0 } else { 0.0 });
            }
        }

        let packed = Matrix::from_values(2, 2, &[1u8, 2, 3, 4]).unwrap();
        assert_eq!(packed.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(Matrix::from_values(1, 2, &[1i32]).is_err());

        let empty = Matrix::from_rows::<Vec<f64>>(&[]).unwrap();
        assert_eq!(empty.shape(), (0, 0));
    }

    #[test]
    fn test_column_view_borrows() {
        let m = sample();
        let col = m.column_view(1).unwrap();
        assert_eq!(col.col(), 1);
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(1).unwrap(), 5.0);
        assert!(matches!(
            col.get(2),
            Err(MatrixError::VectorIndexOutOfBounds { index: 2, len: 2 })
        ));
        assert_eq!(col.iter().collect::<Vec<_>>(), vec![2.0, 5.0]);
        assert_eq!(col.dot([1.0, 2.0]).unwrap(), 12.0);
        assert!(col.dot([1.0]).is_err());
        assert_eq!(col.to_vector(), m.column(1).unwrap());

        let empty = Matrix::zeros(0, 3);
        let col = empty.column_view(2).unwrap();
        assert!(col.is_empty());
        assert_eq!(col.iter().count(), 0);
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let rows = 1usize << (usize::BITS - 1);
        assert!(matches!(
            Matrix::from_vec(rows, 2, vec![]),
            Err(MatrixError::ShapeOverflow { cols: 2, .. })
        ));
        assert!(matches!(
            Matrix::from_values::<f64>(2, rows, &[]),
            Err(MatrixError::ShapeOverflow { rows: 2, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "overflows")]
    fn test_zeros_overflow_panics() {
        let _ = Matrix::zeros(usize::MAX, 2);
    }

    #[test]
    fn test_random_is_seeded() {
        let a = Matrix::random(4, 3, &mut ChaCha8Rng::seed_from_u64(7));
        let b = Matrix::random(4, 3, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.as_slice().iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_row_view_writes_through() {
        let mut m = sample();
        {
            let mut row = m.row_view_mut(1).unwrap();
            assert_eq!(row.row(), 1);
            row.set(0, 40.0).unwrap();
            row.mutable_multiply(2.0);
            assert!(row.set(3, 0.0).is_err());
        }
        assert_eq!(m.get(1, 0).unwrap(), 80.0);
        assert_eq!(m.get(1, 2).unwrap(), 12.0);
        assert_eq!(m.get(0, 0).unwrap(), 1.0);

        let view = m.row_view(0).unwrap();
        assert_eq!(view.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(view.dot([1.0, 1.0, 1.0]).unwrap(), 6.0);
        assert_eq!(view.to_vector().as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_copy_is_independent() {
        let m = sample();
        let mut c = m.clone();
        c.set(0, 0, 100.0).unwrap();
        assert_eq!(m.get(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_zero_out() {
        let mut m = sample();
        m.zero_out();
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(m.shape(), (2, 3));
    }

    #[test]
    fn test_transpose() {
        let m = sample();
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(t.get(j, i).unwrap(), m.get(i, j).unwrap());
            }
        }
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_swap_rows_and_column() {
        let mut m = sample();
        m.swap_rows(1, 0).unwrap();
        assert_eq!(m.row_view(0).unwrap().as_slice(), &[4.0, 5.0, 6.0]);
        assert_eq!(m.column(2).unwrap().as_slice(), &[6.0, 3.0]);
        m.swap_rows(1, 1).unwrap();
        assert_eq!(m.row_view(1).unwrap().as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ndarray_round_trip() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let m = Matrix::from(&a);
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.get(2, 1).unwrap(), 6.0);
        assert_eq!(m.to_ndarray(), a);

        let t = Matrix::from(a.t());
        assert_eq!(t, m.transpose());
    }

    #[test]
    fn test_approx_eq_checks_shape() {
        let m = sample();
        let mut close = m.clone();
        close.mutable_add_scalar(1e-13);
        assert_abs_diff_eq!(m, close, epsilon = 1e-12);
        assert!(!m.abs_diff_eq(&m.transpose(), 1.0));
    }
}
