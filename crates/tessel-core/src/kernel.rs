//! Low-level strided kernels.
//!
//! Each kernel takes its operands as explicit strided views (data slice,
//! shape, strides) plus a scalar operator, and walks the output positions
//! using the index arithmetic in [`crate::index`]. Kernels never allocate
//! output storage and never validate shapes; the wrappers in [`crate::ops`]
//! do both before calling in.
//!
//! Every kernel has a sequential form and a `par_` form built on rayon. The
//! parallel forms split the outer loop over output positions, keep each
//! position's inner work sequential, and write results back in position order,
//! so they produce exactly what the sequential forms produce.

mod map;
mod reduce;
mod zip;

pub use map::{par_tensor_map, tensor_map};
pub use reduce::{par_tensor_reduce, tensor_reduce};
pub use zip::{par_tensor_zip, tensor_zip};

/// Read-only strided operand.
///
/// `data` starts at the operand's first element (the tensor offset has
/// already been applied).
#[derive(Debug, Clone, Copy)]
pub struct StridedRef<'a> {
    pub data: &'a [f64],
    pub shape: &'a [usize],
    pub strides: &'a [usize],
}

impl<'a> StridedRef<'a> {
    pub fn new(data: &'a [f64], shape: &'a [usize], strides: &'a [usize]) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Logical element count.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Writable strided operand.
#[derive(Debug)]
pub struct StridedMut<'a> {
    pub data: &'a mut [f64],
    pub shape: &'a [usize],
    pub strides: &'a [usize],
}

impl<'a> StridedMut<'a> {
    pub fn new(data: &'a mut [f64], shape: &'a [usize], strides: &'a [usize]) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Logical element count.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}
