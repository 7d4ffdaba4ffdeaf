//! Tensor operations built on the map, zip and reduce kernels.
//!
//! All operations return new tensors (functional style). The free functions
//! [`map`], [`zip`] and [`reduce`] run on [`SimpleOps`]; use a
//! [`ParallelOps`] value through the [`TensorOps`] trait to run on rayon.

pub mod arithmetic;
pub mod backend;
pub mod comparison;
pub mod reduction;

pub use backend::{ParallelOps, SimpleOps, TensorOps};

use crate::tensor::Tensor;
use crate::Result;

/// Apply `f` to every element of `a`, into `out` if given.
pub fn map<F>(f: F, a: &Tensor, out: Option<&Tensor>) -> Result<Tensor>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    SimpleOps.map(f, a, out)
}

/// Combine `a` and `b` elementwise with broadcasting.
pub fn zip<F>(f: F, a: &Tensor, b: &Tensor) -> Result<Tensor>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    SimpleOps.zip(f, a, b)
}

/// Fold `a` along `dims`, starting from `start` (or into `out`).
pub fn reduce<F>(
    f: F,
    start: f64,
    a: &Tensor,
    dims: &[usize],
    out: Option<&Tensor>,
) -> Result<Tensor>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    SimpleOps.reduce(f, start, a, dims, out)
}
