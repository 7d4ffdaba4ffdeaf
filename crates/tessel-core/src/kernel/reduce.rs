use rayon::prelude::*;

use super::{StridedMut, StridedRef};
use crate::index::{count, index_to_position, IndexBuf, MAX_DIMS};

/// Fold `input` into `out` along the dimensions named by `reduce_shape`.
///
/// `reduce_shape` has the same rank as `input` and `out`. An entry of 1 marks a
/// kept dimension (it walks with the output index); any other entry is the
/// input size of a reduced dimension, enumerated in full. `reduce_size` is the
/// product of `reduce_shape`.
///
/// The kernel only folds: every output element must already hold the
/// reduction's start value. For each output element the fold visits
/// `reduce_pos = 0..reduce_size` in ascending order, i.e. row-major over
/// `reduce_shape`, which fixes the floating-point result for
/// non-associative `f`.
pub fn tensor_reduce<F>(
    out: StridedMut<'_>,
    input: StridedRef<'_>,
    reduce_shape: &[usize],
    reduce_size: usize,
    f: F,
) where
    F: Fn(f64, f64) -> f64,
{
    let rank = input.shape.len();
    debug_assert_eq!(out.shape.len(), rank);
    debug_assert_eq!(reduce_shape.len(), rank);

    let mut out_index: IndexBuf = [0; MAX_DIMS];
    let mut in_index: IndexBuf = [0; MAX_DIMS];

    for pos_out in 0..out.numel() {
        count(pos_out, out.shape, &mut out_index);
        let o = index_to_position(&out_index[..rank], out.strides);
        out.data[o] = fold_one(
            out.data[o],
            &out_index[..rank],
            &mut in_index,
            input,
            reduce_shape,
            reduce_size,
            &f,
        );
    }
}

/// Parallel form of [`tensor_reduce`]. Output positions are distributed across
/// threads; each position's fold runs sequentially in the same order.
pub fn par_tensor_reduce<F>(
    out: StridedMut<'_>,
    input: StridedRef<'_>,
    reduce_shape: &[usize],
    reduce_size: usize,
    f: F,
) where
    F: Fn(f64, f64) -> f64 + Sync,
{
    let rank = input.shape.len();
    debug_assert_eq!(out.shape.len(), rank);
    debug_assert_eq!(reduce_shape.len(), rank);

    let n = out.numel();
    let StridedMut {
        data: out_data,
        shape: out_shape,
        strides: out_strides,
    } = out;
    let seeds: &[f64] = &*out_data;

    let results: Vec<(usize, f64)> = (0..n)
        .into_par_iter()
        .map_init(
            || [[0usize; MAX_DIMS]; 2],
            |[out_index, in_index]: &mut [IndexBuf; 2], pos_out| {
                count(pos_out, out_shape, out_index);
                let o = index_to_position(&out_index[..rank], out_strides);
                let acc = fold_one(
                    seeds[o],
                    &out_index[..rank],
                    in_index,
                    input,
                    reduce_shape,
                    reduce_size,
                    &f,
                );
                (o, acc)
            },
        )
        .collect();

    for (o, v) in results {
        out_data[o] = v;
    }
}

#[inline]
fn fold_one<F>(
    start: f64,
    out_index: &[usize],
    in_index: &mut [usize],
    input: StridedRef<'_>,
    reduce_shape: &[usize],
    reduce_size: usize,
    f: &F,
) -> f64
where
    F: Fn(f64, f64) -> f64,
{
    let rank = out_index.len();
    let mut acc = start;
    for reduce_pos in 0..reduce_size {
        count(reduce_pos, reduce_shape, in_index);
        for d in 0..rank {
            if reduce_shape[d] == 1 {
                in_index[d] = out_index[d];
            }
        }
        acc = f(acc, input.data[index_to_position(&in_index[..rank], input.strides)]);
    }
    acc
}
