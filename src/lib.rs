pub mod decomposition;
pub mod dense;
pub mod error;
pub mod parallel;

pub use decomposition::{LuDecomposition, LuFactors, LuOptions};
pub use dense::{ColumnView, DenseVector, Matrix, RowView, RowViewMut};
pub use error::{BlockFailure, MatrixError, ParallelError};
pub use parallel::{block_ranges, BlockRange, Executor, ExecutorBuilder, Parallelism};
