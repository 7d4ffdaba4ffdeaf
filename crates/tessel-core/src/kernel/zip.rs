use rayon::prelude::*;

use super::{StridedMut, StridedRef};
use crate::index::{broadcast_index, count, index_to_position, IndexBuf, MAX_DIMS};

/// Combine `a` and `b` elementwise with `f`, writing into `out`.
///
/// Each output position is projected independently into `a`'s and `b`'s
/// shapes, so both inputs broadcast against the output shape rather than
/// against each other.
pub fn tensor_zip<F>(out: StridedMut<'_>, a: StridedRef<'_>, b: StridedRef<'_>, f: F)
where
    F: Fn(f64, f64) -> f64,
{
    let out_rank = out.shape.len();
    let mut out_index: IndexBuf = [0; MAX_DIMS];
    let mut a_index: IndexBuf = [0; MAX_DIMS];
    let mut b_index: IndexBuf = [0; MAX_DIMS];

    for pos in 0..out.numel() {
        count(pos, out.shape, &mut out_index);
        let big = &out_index[..out_rank];
        broadcast_index(big, out.shape, a.shape, &mut a_index);
        broadcast_index(big, out.shape, b.shape, &mut b_index);

        let x = a.data[index_to_position(&a_index[..a.shape.len()], a.strides)];
        let y = b.data[index_to_position(&b_index[..b.shape.len()], b.strides)];
        out.data[index_to_position(big, out.strides)] = f(x, y);
    }
}

/// Parallel form of [`tensor_zip`].
pub fn par_tensor_zip<F>(out: StridedMut<'_>, a: StridedRef<'_>, b: StridedRef<'_>, f: F)
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    let n = out.numel();
    let StridedMut {
        data: out_data,
        shape: out_shape,
        strides: out_strides,
    } = out;
    let out_rank = out_shape.len();

    let results: Vec<(usize, f64)> = (0..n)
        .into_par_iter()
        .map_init(
            || [[0usize; MAX_DIMS]; 3],
            |[out_index, a_index, b_index]: &mut [IndexBuf; 3], pos| {
                count(pos, out_shape, out_index);
                let big = &out_index[..out_rank];
                broadcast_index(big, out_shape, a.shape, a_index);
                broadcast_index(big, out_shape, b.shape, b_index);

                let x = a.data[index_to_position(&a_index[..a.shape.len()], a.strides)];
                let y = b.data[index_to_position(&b_index[..b.shape.len()], b.strides)];
                (index_to_position(big, out_strides), f(x, y))
            },
        )
        .collect();

    for (o, v) in results {
        out_data[o] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_same_shape() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        let mut out = [0.0; 3];
        tensor_zip(
            StridedMut::new(&mut out, &[3], &[1]),
            StridedRef::new(&a, &[3], &[1]),
            StridedRef::new(&b, &[3], &[1]),
            |x, y| x + y,
        );
        assert_eq!(out, [11.0, 22.0, 33.0]);
    }

    #[test]
    fn test_zip_outer_broadcast() {
        // (3, 1) x (1, 2) -> (3, 2)
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 100.0];
        let mut out = [0.0; 6];
        tensor_zip(
            StridedMut::new(&mut out, &[3, 2], &[2, 1]),
            StridedRef::new(&a, &[3, 1], &[1, 1]),
            StridedRef::new(&b, &[1, 2], &[2, 1]),
            |x, y| x * y,
        );
        assert_eq!(out, [10.0, 100.0, 20.0, 200.0, 30.0, 300.0]);
    }

    #[test]
    fn test_zip_lower_rank_operand() {
        // (2, 3) - (3,) row vector
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [1.0, 2.0, 3.0];
        let mut out = [0.0; 6];
        tensor_zip(
            StridedMut::new(&mut out, &[2, 3], &[3, 1]),
            StridedRef::new(&a, &[2, 3], &[3, 1]),
            StridedRef::new(&b, &[3], &[1]),
            |x, y| x - y,
        );
        assert_eq!(out, [0.0, 0.0, 0.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_zip_is_not_commutative_in_operands() {
        let a = [8.0, 6.0];
        let b = [2.0, 3.0];
        let mut out = [0.0; 2];
        tensor_zip(
            StridedMut::new(&mut out, &[2], &[1]),
            StridedRef::new(&a, &[2], &[1]),
            StridedRef::new(&b, &[2], &[1]),
            |x, y| x / y,
        );
        assert_eq!(out, [4.0, 2.0]);
    }

    #[test]
    fn test_par_zip_matches_sequential() {
        let a: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..4).map(|i| 1.0 + i as f64).collect();
        let mut seq = vec![0.0; 24];
        let mut par = vec![0.0; 24];

        tensor_zip(
            StridedMut::new(&mut seq, &[2, 3, 4], &[12, 4, 1]),
            StridedRef::new(&a, &[2, 3, 4], &[12, 4, 1]),
            StridedRef::new(&b, &[4], &[1]),
            |x, y| x / y,
        );
        par_tensor_zip(
            StridedMut::new(&mut par, &[2, 3, 4], &[12, 4, 1]),
            StridedRef::new(&a, &[2, 3, 4], &[12, 4, 1]),
            StridedRef::new(&b, &[4], &[1]),
            |x, y| x / y,
        );
        assert_eq!(seq, par);
    }
}
