//! # LU decomposition with partial pivoting
//!
//! Factors a dense `rows x cols` matrix `A` into `P * A = L * U`, where `L`
//! is unit lower triangular (`rows x k`), `U` is upper triangular
//! (`k x cols`), `P` is a row permutation and `k = min(rows, cols)`.
//!
//! At every elimination step the row with the largest magnitude in the
//! current column becomes the pivot. A zero or tiny pivot is not an error:
//! it ends up on `U`'s diagonal and callers that care must inspect it, or
//! ask for [`LuOptions::strict`] to get [`MatrixError::Singular`] instead.
//!
//! The parallel variant splits the row updates of each elimination step
//! across an [`Executor`]; pivot search and row swaps stay sequential
//! between steps.

use crate::dense::{swap_row_slices, Matrix};
use crate::error::MatrixError;
use crate::parallel::Executor;

mod solve;

/// Options for [`LuDecomposition::compute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuOptions {
    strict: bool,
    tolerance: f64,
}

impl Default for LuOptions {
    fn default() -> Self {
        LuOptions {
            strict: false,
            tolerance: 1e-14,
        }
    }
}

impl LuOptions {
    /// Fail with [`MatrixError::Singular`] when the best pivot magnitude of
    /// a step is at or below the tolerance.
    pub fn strict() -> Self {
        LuOptions {
            strict: true,
            ..Default::default()
        }
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// The three factors of `P * A = L * U`, independent of `A` and of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct LuFactors {
    pub l: Matrix,
    pub u: Matrix,
    pub p: Matrix,
}

/// Packed LU factorization: `U` on and above the diagonal, the multipliers
/// of `L` below it.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: Matrix,
    perm: Vec<usize>,
    pivot_sign: f64,
}

impl LuDecomposition {
    /// Sequential, non-strict decomposition.
    pub fn new(a: &Matrix) -> Result<Self, MatrixError> {
        Self::compute(a, &Executor::sequential(), LuOptions::default())
    }

    pub fn compute(
        a: &Matrix,
        executor: &Executor,
        options: LuOptions,
    ) -> Result<Self, MatrixError> {
        let (rows, cols) = a.shape();
        let mut lu = a.clone();
        let mut perm: Vec<usize> = (0..rows).collect();
        let mut pivot_sign = 1.0;
        let data = lu.as_mut_slice();

        for k in 0..rows.min(cols) {
            let mut pivot_row = k;
            let mut magnitude = data[k * cols + k].abs();
            for r in k + 1..rows {
                let candidate = data[r * cols + k].abs();
                if candidate > magnitude {
                    magnitude = candidate;
                    pivot_row = r;
                }
            }

            if options.strict && !(magnitude > options.tolerance) {
                return Err(MatrixError::Singular { step: k, magnitude });
            }

            if pivot_row != k {
                swap_row_slices(data, cols, k, pivot_row);
                perm.swap(k, pivot_row);
                pivot_sign = -pivot_sign;
            }

            // Column already eliminated; its multipliers stay zero.
            if magnitude == 0.0 {
                log::warn!("zero pivot at elimination step {} of {}x{} LU", k, rows, cols);
                continue;
            }

            let (head, trailing) = data.split_at_mut((k + 1) * cols);
            let pivot = &head[k * cols..];
            executor.run_blocks_mut(rows - k - 1, trailing, cols, |_, block| {
                eliminate(pivot, k, block);
                Ok(())
            })?;
        }

        log::debug!(
            "LU of {}x{} matrix done, {} threads, strict: {}",
            rows,
            cols,
            executor.num_threads(),
            options.strict
        );

        Ok(LuDecomposition {
            lu,
            perm,
            pivot_sign,
        })
    }

    #[inline]
    fn rank_bound(&self) -> usize {
        self.lu.rows().min(self.lu.cols())
    }

    /// Unit lower triangular factor, `rows x min(rows, cols)`.
    pub fn l(&self) -> Matrix {
        let rows = self.lu.rows();
        let k = self.rank_bound();
        let mut l = Matrix::zeros(rows, k);
        for i in 0..rows {
            let packed = self.lu.row_slice(i);
            for j in 0..i.min(k) {
                l[(i, j)] = packed[j];
            }
            if i < k {
                l[(i, i)] = 1.0;
            }
        }
        l
    }

    /// Upper triangular factor, `min(rows, cols) x cols`.
    pub fn u(&self) -> Matrix {
        let cols = self.lu.cols();
        let k = self.rank_bound();
        let mut u = Matrix::zeros(k, cols);
        for i in 0..k {
            let packed = self.lu.row_slice(i);
            for j in i..cols {
                u[(i, j)] = packed[j];
            }
        }
        u
    }

    /// Permutation matrix with `(P * A)` row `i` equal to `A` row
    /// `permutation()[i]`.
    pub fn p(&self) -> Matrix {
        let n = self.perm.len();
        let mut p = Matrix::zeros(n, n);
        for (i, &src) in self.perm.iter().enumerate() {
            p[(i, src)] = 1.0;
        }
        p
    }

    pub fn factors(&self) -> LuFactors {
        LuFactors {
            l: self.l(),
            u: self.u(),
            p: self.p(),
        }
    }

    pub fn permutation(&self) -> &[usize] {
        &self.perm
    }

    /// `1.0` for an even number of row swaps, `-1.0` for an odd number.
    pub fn pivot_sign(&self) -> f64 {
        self.pivot_sign
    }

    pub fn packed(&self) -> &Matrix {
        &self.lu
    }
}

/// Eliminate column `k` from every row of `block` using `pivot` (row `k`),
/// storing the multiplier in place of the eliminated entry.
fn eliminate(pivot: &[f64], k: usize, block: &mut [f64]) {
    let cols = pivot.len();
    let p = pivot[k];
    for row in block.chunks_exact_mut(cols) {
        let m = row[k] / p;
        row[k] = m;
        for (x, &pj) in row[k + 1..].iter_mut().zip(&pivot[k + 1..]) {
            *x -= m * pj;
        }
    }
}

impl Matrix {
    /// Sequential LU decomposition with partial pivoting.
    pub fn lu(&self) -> Result<LuDecomposition, MatrixError> {
        LuDecomposition::new(self)
    }

    pub fn lu_with(
        &self,
        executor: &Executor,
        options: LuOptions,
    ) -> Result<LuDecomposition, MatrixError> {
        LuDecomposition::compute(self, executor, options)
    }
}
