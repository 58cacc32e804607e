use std::ops::Range;

use thiserror::Error;

/// Errors produced by matrix construction, access, arithmetic and decomposition.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// Operand shapes are incompatible for `op`.
    #[error("dimension mismatch in {op}: left is {}x{}, right is {}x{}", .left.0, .left.1, .right.0, .right.1)]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("index ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("index {index} out of bounds for vector of length {len}")]
    VectorIndexOutOfBounds { index: usize, len: usize },

    #[error("data length mismatch: expected {expected} values, got {got}")]
    InvalidData { expected: usize, got: usize },

    #[error("matrix shape {rows}x{cols} overflows the addressable element count")]
    ShapeOverflow { rows: usize, cols: usize },

    #[error("value at position {index} cannot be represented as f64")]
    Conversion { index: usize },

    #[error("operation requires a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Only raised by LU decomposition in strict mode.
    #[error("matrix is singular: best pivot magnitude {magnitude:e} at elimination step {step}")]
    Singular { step: usize, magnitude: f64 },

    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

/// A single block that returned an error or panicked during parallel execution.
#[derive(Debug, Error)]
#[error("block {block} over items {}..{} failed: {error:#}", .range.start, .range.end)]
pub struct BlockFailure {
    pub block: usize,
    pub range: Range<usize>,
    pub error: anyhow::Error,
}

/// Aggregated failures of one parallel run.
///
/// Raised on the calling thread only after every block has finished, so
/// blocks that succeeded have still run to completion.
#[derive(Debug, Error)]
#[error("parallel execution failed: {count} of {total_blocks} blocks failed", count = .failures.len())]
pub struct ParallelError {
    pub total_blocks: usize,
    pub failures: Vec<BlockFailure>,
}

impl ParallelError {
    pub fn failures(&self) -> &[BlockFailure] {
        &self.failures
    }

    pub fn first(&self) -> Option<&BlockFailure> {
        self.failures.first()
    }
}
