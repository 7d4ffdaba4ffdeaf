//! Element-wise comparisons. Results are 1.0 where the predicate holds and
//! 0.0 elsewhere, so they compose with the arithmetic ops as masks.

use crate::ops::zip;
use crate::tensor::Tensor;
use crate::Result;

#[inline]
fn mask(cond: bool) -> f64 {
    if cond {
        1.0
    } else {
        0.0
    }
}

impl Tensor {
    /// self < other
    pub fn lt(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| mask(a < b), self, other)
    }

    /// self > other
    pub fn gt(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| mask(a > b), self, other)
    }

    /// self == other, exact.
    pub fn eq_tensor(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| mask(a == b), self, other)
    }

    /// |self - other| < 1e-2
    pub fn is_close(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| mask((a - b).abs() < 1e-2), self, other)
    }

    /// True if every element of the broadcast pair is within `tol`.
    pub fn all_close(&self, other: &Tensor, tol: f64) -> Result<bool> {
        let diff = zip(move |a, b| mask((a - b).abs() <= tol), self, other)?;
        Ok(diff.to_vec().iter().all(|&v| v == 1.0))
    }
}
