//! # tessel-core
//!
//! Strided tensor kernels for a minimal N-dimensional array engine.
//!
//! Provides:
//! - `Tensor` views (shape, strides, offset) over shared `f64` storage
//! - NumPy-style broadcasting and index arithmetic
//! - Generic `map`, `zip` and `reduce` kernels, sequential and rayon-parallel
//! - Arithmetic, activation, comparison and reduction ops built on them
//!
//! ```rust
//! use tessel_core::prelude::*;
//!
//! let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
//! let b = Tensor::from_f64(&[10.0, 20.0, 30.0], &[3]);
//! let c = a.add(&b)?.sum_dims(&[0])?;
//! assert_eq!(c.to_vec(), vec![25.0, 47.0, 69.0]);
//! # Ok::<(), TesselError>(())
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod kernel;
pub mod ops;
pub mod prelude;
pub mod shape;
pub mod storage;
pub mod tensor;

pub use config::KernelConfig;
pub use error::TesselError;
pub use shape::{Shape, MAX_DIMS};
pub use storage::Storage;
pub use tensor::Tensor;

pub type Result<T> = std::result::Result<T, TesselError>;
