//! Element-wise arithmetic operations on tensors.

use crate::ops::{map, zip};
use crate::tensor::Tensor;
use crate::Result;

impl Tensor {
    /// Element-wise addition: self + other.
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| a + b, self, other)
    }

    /// Element-wise subtraction: self - other.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| a - b, self, other)
    }

    /// Element-wise multiplication: self * other.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| a * b, self, other)
    }

    /// Element-wise division: self / other.
    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        zip(|a, b| a / b, self, other)
    }

    /// Element-wise power: self^other.
    pub fn pow(&self, other: &Tensor) -> Result<Tensor> {
        zip(f64::powf, self, other)
    }

    /// Element-wise maximum.
    pub fn maximum(&self, other: &Tensor) -> Result<Tensor> {
        zip(f64::max, self, other)
    }

    /// Element-wise minimum.
    pub fn minimum(&self, other: &Tensor) -> Result<Tensor> {
        zip(f64::min, self, other)
    }

    /// Copy of self (identity map).
    pub fn id(&self) -> Result<Tensor> {
        map(|a| a, self, None)
    }

    /// Element-wise negation: -self.
    pub fn neg(&self) -> Result<Tensor> {
        map(|a| -a, self, None)
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Result<Tensor> {
        map(f64::abs, self, None)
    }

    /// Element-wise square root.
    pub fn sqrt(&self) -> Result<Tensor> {
        map(f64::sqrt, self, None)
    }

    /// Element-wise reciprocal: 1/self.
    pub fn inv(&self) -> Result<Tensor> {
        map(|a| 1.0 / a, self, None)
    }

    /// Element-wise exponential: e^self.
    pub fn exp(&self) -> Result<Tensor> {
        map(f64::exp, self, None)
    }

    /// Element-wise natural logarithm.
    pub fn log(&self) -> Result<Tensor> {
        map(f64::ln, self, None)
    }

    /// Rectified linear unit: max(self, 0).
    pub fn relu(&self) -> Result<Tensor> {
        map(|a| if a > 0.0 { a } else { 0.0 }, self, None)
    }

    /// Logistic sigmoid, evaluated without overflowing `exp` for large |x|.
    pub fn sigmoid(&self) -> Result<Tensor> {
        map(
            |a| {
                if a >= 0.0 {
                    1.0 / (1.0 + (-a).exp())
                } else {
                    let e = a.exp();
                    e / (1.0 + e)
                }
            },
            self,
            None,
        )
    }

    /// Element-wise hyperbolic tangent.
    pub fn tanh(&self) -> Result<Tensor> {
        map(f64::tanh, self, None)
    }

    /// Scalar addition: self + scalar.
    pub fn add_scalar(&self, scalar: f64) -> Result<Tensor> {
        map(move |a| a + scalar, self, None)
    }

    /// Scalar multiplication: self * scalar.
    pub fn mul_scalar(&self, scalar: f64) -> Result<Tensor> {
        map(move |a| a * scalar, self, None)
    }

    /// Clamp all elements to [min, max].
    pub fn clamp(&self, min: f64, max: f64) -> Result<Tensor> {
        map(move |a| a.clamp(min, max), self, None)
    }
}
