//! Index arithmetic shared by every kernel.
//!
//! These are the primitives that turn a flat output position into storage
//! offsets: row-major enumeration of a shape (`count`), the stride dot product
//! (`index_to_position`), and the broadcast projection of an index from a
//! larger shape into a smaller one (`broadcast_index`).

use crate::shape::Shape;
use crate::{Result, TesselError};

pub use crate::shape::MAX_DIMS;

/// Stack scratch buffer for one multi-dimensional index.
pub type IndexBuf = [usize; MAX_DIMS];

/// Write the multi-index of `position` under row-major (last dimension
/// fastest) enumeration of `shape` into `out_index[..shape.len()]`.
///
/// `position` must be in `0..product(shape)`.
#[inline]
pub fn count(position: usize, shape: &[usize], out_index: &mut [usize]) {
    debug_assert!(out_index.len() >= shape.len());
    let mut rem = position;
    for d in (0..shape.len()).rev() {
        let size = shape[d];
        out_index[d] = rem % size;
        rem /= size;
    }
    debug_assert_eq!(rem, 0, "position {position} outside shape {shape:?}");
}

/// Storage offset of `index` under `strides`: `sum(index[d] * strides[d])`.
#[inline]
pub fn index_to_position(index: &[usize], strides: &[usize]) -> usize {
    strides
        .iter()
        .zip(index.iter())
        .map(|(s, i)| s * i)
        .sum()
}

/// Project `big_index` (valid for `big_shape`) onto `shape`, writing the
/// result into `out_index[..shape.len()]`.
///
/// Dimensions are right-aligned. A size-1 dimension of `shape` always maps to
/// 0; leading dimensions that exist only in `big_shape` are dropped.
#[inline]
pub fn broadcast_index(
    big_index: &[usize],
    big_shape: &[usize],
    shape: &[usize],
    out_index: &mut [usize],
) {
    debug_assert!(big_shape.len() >= shape.len());
    let offset = big_shape.len() - shape.len();
    for (d, &size) in shape.iter().enumerate() {
        out_index[d] = if size == 1 { 0 } else { big_index[d + offset] };
    }
}

/// Broadcast shape of `a` and `b`.
pub fn shape_broadcast(a: &Shape, b: &Shape) -> Result<Shape> {
    a.broadcast_with(b).ok_or_else(|| TesselError::BroadcastError {
        a: a.dims().to_vec(),
        b: b.dims().to_vec(),
    })
}
