//! Value boundary for mathtree.
//!
//! Everything a compiled expression produces or consumes is a [`Value`]. Matrix
//! valued results carry a storage kind (dense or sparse), a shape and an optional
//! datatype tag; the conjugate transpose rules live on [`Matrix::ctranspose`].

mod error;
mod matrix;
mod scalar;
mod value;

pub use error::{EvalError, Result};
pub use matrix::{
    checked_element_count, DataType, DenseMatrix, Matrix, Nested, SparseMatrix, Storage,
    StorageKind, MAX_ELEMENTS,
};
pub use num_complex::Complex64;
pub use scalar::Scalar;
pub use value::{Callable, NativeFn, Value};
