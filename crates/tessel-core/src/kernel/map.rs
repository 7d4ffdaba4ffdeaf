use rayon::prelude::*;

use super::{StridedMut, StridedRef};
use crate::index::{broadcast_index, count, index_to_position, IndexBuf, MAX_DIMS};

/// Apply `f` to every element of `input`, writing into `out`.
///
/// Positions are enumerated in `out`'s shape and projected into `input`'s
/// shape, so `input` may have lower rank or size-1 dimensions. The loop runs
/// over `input.numel()` positions: when `out` is strictly larger than `input`
/// only its first `input.numel()` row-major positions are written.
pub fn tensor_map<F>(out: StridedMut<'_>, input: StridedRef<'_>, f: F)
where
    F: Fn(f64) -> f64,
{
    let out_rank = out.shape.len();
    let in_rank = input.shape.len();
    let mut out_index: IndexBuf = [0; MAX_DIMS];
    let mut in_index: IndexBuf = [0; MAX_DIMS];

    for pos in 0..input.numel() {
        count(pos, out.shape, &mut out_index);
        broadcast_index(&out_index[..out_rank], out.shape, input.shape, &mut in_index);
        let value = input.data[index_to_position(&in_index[..in_rank], input.strides)];
        out.data[index_to_position(&out_index[..out_rank], out.strides)] = f(value);
    }
}

/// Parallel form of [`tensor_map`].
pub fn par_tensor_map<F>(out: StridedMut<'_>, input: StridedRef<'_>, f: F)
where
    F: Fn(f64) -> f64 + Sync,
{
    let StridedMut {
        data: out_data,
        shape: out_shape,
        strides: out_strides,
    } = out;
    let out_rank = out_shape.len();
    let in_rank = input.shape.len();

    let results: Vec<(usize, f64)> = (0..input.numel())
        .into_par_iter()
        .map_init(
            || ([0usize; MAX_DIMS], [0usize; MAX_DIMS]),
            |(out_index, in_index): &mut (IndexBuf, IndexBuf), pos| {
                count(pos, out_shape, out_index);
                broadcast_index(&out_index[..out_rank], out_shape, input.shape, in_index);
                let value = input.data[index_to_position(&in_index[..in_rank], input.strides)];
                (index_to_position(&out_index[..out_rank], out_strides), f(value))
            },
        )
        .collect();

    for (o, v) in results {
        out_data[o] = v;
    }
}
