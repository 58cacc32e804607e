use approx::{AbsDiffEq, RelativeEq};

use crate::error::MatrixError;

/// An owned dense vector of `f64`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVector {
    data: Vec<f64>,
}

impl DenseVector {
    pub fn zeros(len: usize) -> Self {
        DenseVector {
            data: vec![0.0; len],
        }
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        DenseVector { data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<f64, MatrixError> {
        checked_get(&self.data, index)
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), MatrixError> {
        checked_set(&mut self.data, index, value)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn dot(&self, other: impl AsRef<[f64]>) -> Result<f64, MatrixError> {
        dot(&self.data, other.as_ref())
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn mutable_add(&mut self, other: impl AsRef<[f64]>) -> Result<(), MatrixError> {
        let other = other.as_ref();
        if other.len() != self.data.len() {
            return Err(MatrixError::DimensionMismatch {
                op: "vector add",
                left: (self.data.len(), 1),
                right: (other.len(), 1),
            });
        }
        for (a, b) in self.data.iter_mut().zip(other) {
            *a += b;
        }
        Ok(())
    }

    pub fn mutable_multiply(&mut self, scalar: f64) {
        self.data.iter_mut().for_each(|v| *v *= scalar);
    }
}

impl AsRef<[f64]> for DenseVector {
    fn as_ref(&self) -> &[f64] {
        &self.data
    }
}

impl From<Vec<f64>> for DenseVector {
    fn from(data: Vec<f64>) -> Self {
        DenseVector { data }
    }
}

impl FromIterator<f64> for DenseVector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        DenseVector {
            data: iter.into_iter().collect(),
        }
    }
}

impl AbsDiffEq for DenseVector {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.len() == other.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for DenseVector {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.len() == other.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

/// Read-only view of one row of a [`Matrix`](super::Matrix).
///
/// Borrows the matrix, so the view can never outlive it or observe it while
/// it is being mutated.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    row: usize,
    data: &'a [f64],
}

impl<'a> RowView<'a> {
    pub(crate) fn new(row: usize, data: &'a [f64]) -> Self {
        RowView { row, data }
    }

    /// Index of the viewed row in the owning matrix.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<f64, MatrixError> {
        checked_get(self.data, index)
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }

    pub fn to_vector(&self) -> DenseVector {
        DenseVector::from_vec(self.data.to_vec())
    }

    pub fn dot(&self, other: impl AsRef<[f64]>) -> Result<f64, MatrixError> {
        dot(self.data, other.as_ref())
    }
}

impl AsRef<[f64]> for RowView<'_> {
    fn as_ref(&self) -> &[f64] {
        self.data
    }
}

/// Mutable view of one row of a [`Matrix`](super::Matrix). Writes go
/// straight to the matrix's storage.
#[derive(Debug)]
pub struct RowViewMut<'a> {
    row: usize,
    data: &'a mut [f64],
}

impl<'a> RowViewMut<'a> {
    pub(crate) fn new(row: usize, data: &'a mut [f64]) -> Self {
        RowViewMut { row, data }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<f64, MatrixError> {
        checked_get(&*self.data, index)
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), MatrixError> {
        checked_set(&mut *self.data, index, value)
    }

    pub fn as_slice(&self) -> &[f64] {
        &*self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut *self.data
    }

    pub fn mutable_add_scalar(&mut self, scalar: f64) {
        self.data.iter_mut().for_each(|v| *v += scalar);
    }

    pub fn mutable_multiply(&mut self, scalar: f64) {
        self.data.iter_mut().for_each(|v| *v *= scalar);
    }
}

impl AsRef<[f64]> for RowViewMut<'_> {
    fn as_ref(&self) -> &[f64] {
        &*self.data
    }
}

/// Read-only view of one column of a [`Matrix`](super::Matrix), walking the
/// row-major storage with a stride instead of copying.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    col: usize,
    rows: usize,
    stride: usize,
    data: &'a [f64],
}

impl<'a> ColumnView<'a> {
    /// `data` is the whole matrix storage, `stride` its column count.
    pub(crate) fn new(col: usize, rows: usize, stride: usize, data: &'a [f64]) -> Self {
        ColumnView {
            col,
            rows,
            stride,
            data,
        }
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn get(&self, index: usize) -> Result<f64, MatrixError> {
        if index >= self.rows {
            return Err(MatrixError::VectorIndexOutOfBounds {
                index,
                len: self.rows,
            });
        }
        Ok(self.data[index * self.stride + self.col])
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        let data: &'a [f64] = self.data;
        data.iter().skip(self.col).step_by(self.stride).copied()
    }

    pub fn to_vector(&self) -> DenseVector {
        self.iter().collect()
    }

    pub fn dot(&self, other: impl AsRef<[f64]>) -> Result<f64, MatrixError> {
        let other = other.as_ref();
        if other.len() != self.rows {
            return Err(MatrixError::DimensionMismatch {
                op: "dot",
                left: (self.rows, 1),
                right: (other.len(), 1),
            });
        }
        Ok(self.iter().zip(other).map(|(x, y)| x * y).sum())
    }
}

fn checked_get(data: &[f64], index: usize) -> Result<f64, MatrixError> {
    data.get(index)
        .copied()
        .ok_or(MatrixError::VectorIndexOutOfBounds {
            index,
            len: data.len(),
        })
}

fn checked_set(data: &mut [f64], index: usize, value: f64) -> Result<(), MatrixError> {
    let len = data.len();
    let slot = data
        .get_mut(index)
        .ok_or(MatrixError::VectorIndexOutOfBounds { index, len })?;
    *slot = value;
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> Result<f64, MatrixError> {
    if a.len() != b.len() {
        return Err(MatrixError::DimensionMismatch {
            op: "dot",
            left: (a.len(), 1),
            right: (b.len(), 1),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}
