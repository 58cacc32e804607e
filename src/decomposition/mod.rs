//! # Matrix decompositions
//!
//! Currently LU with partial pivoting, the base for solving linear systems,
//! determinants and inverses elsewhere in the library.

pub mod lu;

pub use lu::{LuDecomposition, LuFactors, LuOptions};
