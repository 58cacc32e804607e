use std::ops::Range;

use super::{DenseVector, Matrix};
use crate::error::MatrixError;
use crate::parallel::Executor;

impl Matrix {
    fn check_same_shape(&self, other: &Matrix, op: &'static str) -> Result<(), MatrixError> {
        if self.shape() != other.shape() {
            return Err(MatrixError::DimensionMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    fn check_multiply(&self, other: &Matrix) -> Result<(), MatrixError> {
        if self.cols != other.rows {
            return Err(MatrixError::DimensionMismatch {
                op: "multiply",
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        let mut out = self.clone();
        out.mutable_add(other)?;
        Ok(out)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        let mut out = self.clone();
        out.mutable_subtract(other)?;
        Ok(out)
    }

    pub fn mutable_add(&mut self, other: &Matrix) -> Result<(), MatrixError> {
        self.check_same_shape(other, "add")?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        Ok(())
    }

    pub fn mutable_subtract(&mut self, other: &Matrix) -> Result<(), MatrixError> {
        self.check_same_shape(other, "subtract")?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a -= b;
        }
        Ok(())
    }

    pub fn mutable_add_scalar(&mut self, scalar: f64) {
        self.data.iter_mut().for_each(|v| *v += scalar);
    }

    pub fn mutable_multiply(&mut self, scalar: f64) {
        self.data.iter_mut().for_each(|v| *v *= scalar);
    }

    /// `self * other` on the calling thread.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix, MatrixError> {
        self.check_multiply(other)?;
        let mut out = Matrix::zeros(self.rows, other.cols);
        multiply_rows(self, other, 0..self.rows, &mut out.data);
        Ok(out)
    }

    /// `self * other` with the output rows split across `executor`'s blocks.
    ///
    /// Every block writes a disjoint row range of the result and runs the
    /// same kernel as [`multiply`](Self::multiply), so both give identical
    /// results.
    pub fn multiply_with(&self, other: &Matrix, executor: &Executor) -> Result<Matrix, MatrixError> {
        self.check_multiply(other)?;
        let mut out = Matrix::zeros(self.rows, other.cols);
        executor.run_blocks_mut(self.rows, &mut out.data, other.cols, |range, chunk| {
            multiply_rows(self, other, range.range(), chunk);
            Ok(())
        })?;
        Ok(out)
    }

    pub fn multiply_vector(&self, v: impl AsRef<[f64]>) -> Result<DenseVector, MatrixError> {
        let v = v.as_ref();
        if v.len() != self.cols {
            return Err(MatrixError::DimensionMismatch {
                op: "multiply_vector",
                left: self.shape(),
                right: (v.len(), 1),
            });
        }
        Ok((0..self.rows)
            .map(|i| self.row_slice(i).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    pub fn column_sums(&self) -> DenseVector {
        DenseVector::from_vec(column_sums_of(self, 0..self.rows))
    }

    /// Column sums with every block accumulating into its own scratch
    /// vector, merged after all blocks finished.
    pub fn column_sums_with(&self, executor: &Executor) -> Result<DenseVector, MatrixError> {
        let sums = executor.run_reduce(
            self.rows,
            vec![0.0; self.cols],
            |range| Ok(column_sums_of(self, range.range())),
            |mut acc, partial| {
                for (a, p) in acc.iter_mut().zip(&partial) {
                    *a += p;
                }
                acc
            },
        )?;
        Ok(DenseVector::from_vec(sums))
    }
}

/// Rows `rows` of `a * b` into `out`, which holds exactly those rows.
fn multiply_rows(a: &Matrix, b: &Matrix, rows: Range<usize>, out: &mut [f64]) {
    let n = b.cols;
    if n == 0 {
        return;
    }
    for (i, out_row) in rows.zip(out.chunks_exact_mut(n)) {
        for (k, &aik) in a.row_slice(i).iter().enumerate() {
            for (o, &bkj) in out_row.iter_mut().zip(b.row_slice(k)) {
                *o += aik * bkj;
            }
        }
    }
}

fn column_sums_of(m: &Matrix, rows: Range<usize>) -> Vec<f64> {
    let mut scratch = vec![0.0; m.cols];
    for i in rows {
        for (s, v) in scratch.iter_mut().zip(m.row_slice(i)) {
            *s += v;
        }
    }
    scratch
}
