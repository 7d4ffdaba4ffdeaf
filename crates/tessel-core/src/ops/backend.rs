//! The `map` / `zip` / `reduce` wrappers and the backends that run them.
//!
//! A backend only decides how a kernel is launched (sequentially or on rayon).
//! Output allocation, shape validation and assembling the strided kernel
//! arguments from tensor metadata are shared by every backend through the
//! provided methods of [`TensorOps`].

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLockReadGuard;
use smallvec::SmallVec;

use crate::config::KernelConfig;
use crate::error::TesselError;
use crate::index::shape_broadcast;
use crate::kernel::{self, StridedMut, StridedRef};
use crate::tensor::Tensor;
use crate::Result;

/// Higher-order tensor operations, parameterised by the scalar function.
///
/// Scalar functions are generic parameters, so each call site monomorphizes
/// its own kernel loop.
pub trait TensorOps {
    /// Run the map kernel.
    fn launch_map<F>(&self, out: StridedMut<'_>, input: StridedRef<'_>, f: F)
    where
        F: Fn(f64) -> f64 + Send + Sync;

    /// Run the zip kernel.
    fn launch_zip<F>(&self, out: StridedMut<'_>, a: StridedRef<'_>, b: StridedRef<'_>, f: F)
    where
        F: Fn(f64, f64) -> f64 + Send + Sync;

    /// Run the reduce kernel.
    fn launch_reduce<F>(
        &self,
        out: StridedMut<'_>,
        input: StridedRef<'_>,
        reduce_shape: &[usize],
        reduce_size: usize,
        f: F,
    ) where
        F: Fn(f64, f64) -> f64 + Send + Sync;

    /// Apply `f` to every element of `a`.
    ///
    /// Without `out`, a zero tensor shaped like `a` is allocated and returned.
    /// With `out`, `a` must broadcast into `out`'s shape; `out` is written in
    /// place and a handle to it is returned.
    fn map<F>(&self, f: F, a: &Tensor, out: Option<&Tensor>) -> Result<Tensor>
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        let out = match out {
            Some(out) => {
                if !out.shape().accepts_broadcast_from(a.shape()) {
                    return Err(TesselError::BroadcastError {
                        a: out.shape().dims().to_vec(),
                        b: a.shape().dims().to_vec(),
                    });
                }
                if out.numel() != a.numel() {
                    tracing::debug!(
                        input = %a.shape(),
                        output = %out.shape(),
                        "map into larger output visits input positions only"
                    );
                }
                out.clone()
            }
            None => Tensor::zeros(a.shape().dims()),
        };
        tracing::trace!(input = %a.shape(), output = %out.shape(), "map");

        {
            let src = Source::read(a, &out);
            let mut dst = out.storage().write();
            self.launch_map(
                StridedMut::new(&mut dst[out.offset()..], out.shape().dims(), out.strides()),
                StridedRef::new(&src[a.offset()..], a.shape().dims(), a.strides()),
                f,
            );
        }
        Ok(out)
    }

    /// Combine `a` and `b` elementwise into a new tensor of their broadcast
    /// shape. Neither input is modified.
    fn zip<F>(&self, f: F, a: &Tensor, b: &Tensor) -> Result<Tensor>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        let shape = if a.shape() == b.shape() {
            a.shape().clone()
        } else {
            let s = shape_broadcast(a.shape(), b.shape())?;
            tracing::debug!(a = %a.shape(), b = %b.shape(), out = %s, "zip broadcast");
            s
        };
        let out = Tensor::zeros(shape.dims());
        tracing::trace!(a = %a.shape(), b = %b.shape(), "zip");

        {
            let a_src = a.storage().read();
            let b_guard;
            let b_src: &[f64] = if b.shares_storage(a) {
                &a_src[..]
            } else {
                b_guard = b.storage().read();
                &b_guard[..]
            };
            let mut dst = out.storage().write();
            self.launch_zip(
                StridedMut::new(&mut dst[..], out.shape().dims(), out.strides()),
                StridedRef::new(&a_src[a.offset()..], a.shape().dims(), a.strides()),
                StridedRef::new(&b_src[b.offset()..], b.shape().dims(), b.strides()),
                f,
            );
        }
        Ok(out)
    }

    /// Fold `a` along `dims` with `f`.
    ///
    /// Without `out`, the result keeps `a`'s rank with every dim in `dims` set
    /// to 1, and starts from `start` everywhere. With `out`, `dims` is not
    /// consulted: `out` is padded with leading size-1 dims to `a`'s rank, each
    /// of its size-1 dims is reduced, it must already hold the start values,
    /// and it is returned with its own shape.
    fn reduce<F>(
        &self,
        f: F,
        start: f64,
        a: &Tensor,
        dims: &[usize],
        out: Option<&Tensor>,
    ) -> Result<Tensor>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        let ndim = a.ndim();
        let (target, caller_out) = match out {
            None => {
                let mut out_dims = a.shape().dims().to_vec();
                for &d in dims {
                    if d >= ndim {
                        return Err(TesselError::InvalidAxis { axis: d, ndim });
                    }
                    out_dims[d] = 1;
                }
                (Tensor::full(&out_dims, start), None)
            }
            Some(out) => {
                if out.ndim() > ndim {
                    return Err(TesselError::RankMismatch {
                        expected: ndim,
                        got: out.ndim(),
                    });
                }
                (out.with_leading_ones(ndim - out.ndim()), Some(out))
            }
        };

        let mut reduce_shape: SmallVec<[usize; 4]> = SmallVec::with_capacity(ndim);
        let mut reduce_size = 1;
        for (&in_dim, &out_dim) in a.shape().dims().iter().zip(target.shape().dims()) {
            if out_dim == 1 {
                reduce_shape.push(in_dim);
                reduce_size *= in_dim;
            } else if out_dim == in_dim {
                reduce_shape.push(1);
            } else {
                return Err(TesselError::ShapeMismatch {
                    expected: a.shape().dims().to_vec(),
                    got: target.shape().dims().to_vec(),
                });
            }
        }
        tracing::trace!(
            input = %a.shape(),
            output = %target.shape(),
            reduce_shape = ?reduce_shape.as_slice(),
            reduce_size,
            "reduce"
        );

        {
            let src = Source::read(a, &target);
            let mut dst = target.storage().write();
            self.launch_reduce(
                StridedMut::new(
                    &mut dst[target.offset()..],
                    target.shape().dims(),
                    target.strides(),
                ),
                StridedRef::new(&src[a.offset()..], a.shape().dims(), a.strides()),
                &reduce_shape,
                reduce_size,
                f,
            );
        }

        Ok(match caller_out {
            Some(out) => out.clone(),
            None => target,
        })
    }
}

/// Input buffer for a kernel whose output may share storage with it.
enum Source<'a> {
    Locked(RwLockReadGuard<'a, Vec<f64>>),
    Copied(Vec<f64>),
}

impl<'a> Source<'a> {
    fn read(input: &'a Tensor, out: &Tensor) -> Self {
        if input.shares_storage(out) {
            tracing::debug!(
                input = %input.shape(),
                output = %out.shape(),
                "output aliases input storage, reading from a snapshot"
            );
            Source::Copied(input.storage().snapshot())
        } else {
            Source::Locked(input.storage().read())
        }
    }
}

impl Deref for Source<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        match self {
            Source::Locked(guard) => guard.as_slice(),
            Source::Copied(data) => data.as_slice(),
        }
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Runs every kernel sequentially on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleOps;

impl TensorOps for SimpleOps {
    fn launch_map<F>(&self, out: StridedMut<'_>, input: StridedRef<'_>, f: F)
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        kernel::tensor_map(out, input, f);
    }

    fn launch_zip<F>(&self, out: StridedMut<'_>, a: StridedRef<'_>, b: StridedRef<'_>, f: F)
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        kernel::tensor_zip(out, a, b, f);
    }

    fn launch_reduce<F>(
        &self,
        out: StridedMut<'_>,
        input: StridedRef<'_>,
        reduce_shape: &[usize],
        reduce_size: usize,
        f: F,
    ) where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        kernel::tensor_reduce(out, input, reduce_shape, reduce_size, f);
    }
}

/// Splits the outer loop of each kernel across rayon workers once the
/// workload passes a threshold. Results match [`SimpleOps`] exactly.
#[derive(Debug, Clone)]
pub struct ParallelOps {
    threshold: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for ParallelOps {
    fn default() -> Self {
        Self::with_threshold(KernelConfig::default().parallel_threshold)
    }
}

impl ParallelOps {
    /// Use rayon's global pool, going parallel at `threshold` element visits.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold,
            pool: None,
        }
    }

    /// Build from a [`KernelConfig`], creating a dedicated pool when
    /// `num_threads` is set.
    pub fn from_config(config: &KernelConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.num_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("tessel-kernel-{i}"))
                    .build()
                    .map_err(|e| TesselError::Config(format!("thread pool: {e}")))?;
                tracing::debug!(threads = n, "built kernel thread pool");
                Some(Arc::new(pool))
            }
            None => None,
        };
        Ok(Self {
            threshold: config.parallel_threshold,
            pool,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl TensorOps for ParallelOps {
    fn launch_map<F>(&self, out: StridedMut<'_>, input: StridedRef<'_>, f: F)
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        if input.numel() < self.threshold {
            kernel::tensor_map(out, input, f);
        } else {
            self.install(|| kernel::par_tensor_map(out, input, f));
        }
    }

    fn launch_zip<F>(&self, out: StridedMut<'_>, a: StridedRef<'_>, b: StridedRef<'_>, f: F)
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        if out.numel() < self.threshold {
            kernel::tensor_zip(out, a, b, f);
        } else {
            self.install(|| kernel::par_tensor_zip(out, a, b, f));
        }
    }

    fn launch_reduce<F>(
        &self,
        out: StridedMut<'_>,
        input: StridedRef<'_>,
        reduce_shape: &[usize],
        reduce_size: usize,
        f: F,
    ) where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        let outputs = out.numel();
        if outputs < 2 || outputs.saturating_mul(reduce_size) < self.threshold {
            kernel::tensor_reduce(out, input, reduce_shape, reduce_size, f);
        } else {
            self.install(|| kernel::par_tensor_reduce(out, input, reduce_shape, reduce_size, f));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_allocates_like_input() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1, 5]);
        let out = SimpleOps.map(|x| x * 2.0, &a, None).unwrap();
        assert_eq!(out.shape().dims(), &[1, 5]);
        assert_eq!(out.to_vec(), vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        assert!(!out.shares_storage(&a));
    }

    #[test]
    fn test_map_into_supplied_out() {
        let a = Tensor::from_f64(&[1.0, 2.0], &[2]);
        let dest = Tensor::zeros(&[2]);
        let out = SimpleOps.map(|x| x + 1.0, &a, Some(&dest)).unwrap();
        assert!(out.shares_storage(&dest));
        assert_eq!(dest.to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_map_rejects_incompatible_out() {
        let a = Tensor::zeros(&[2, 3]);
        let dest = Tensor::zeros(&[3, 2]);
        assert!(matches!(
            SimpleOps.map(|x| x, &a, Some(&dest)),
            Err(TesselError::BroadcastError { .. })
        ));
        // out smaller than input
        let dest = Tensor::zeros(&[1, 3]);
        assert!(SimpleOps.map(|x| x, &a, Some(&dest)).is_err());
    }

    #[test]
    fn test_map_in_place_on_same_tensor() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        SimpleOps.map(|x| x * x, &a, Some(&a)).unwrap();
        assert_eq!(a.to_vec(), vec![1.0, 4.0, 9.0, 16.0]);
    }

    #[test]
    fn test_map_into_aliasing_transposed_view() {
        // Writing a's transpose into a itself must read the original values.
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let t = a.transpose().unwrap();
        SimpleOps.map(|x| x, &t, Some(&a)).unwrap();
        assert_eq!(a.to_vec(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_zip_same_tensor_twice() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0], &[3]);
        let out = SimpleOps.zip(|x, y| x * y, &a, &a).unwrap();
        assert_eq!(out.to_vec(), vec![1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_zip_incompatible_shapes() {
        let a = Tensor::zeros(&[2, 3]);
        let b = Tensor::zeros(&[2, 4]);
        let err = SimpleOps.zip(|x, y| x + y, &a, &b).unwrap_err();
        assert_eq!(
            err,
            TesselError::BroadcastError {
                a: vec![2, 3],
                b: vec![2, 4],
            }
        );
    }

    #[test]
    fn test_reduce_invalid_dim() {
        let a = Tensor::zeros(&[2, 3]);
        assert_eq!(
            SimpleOps.reduce(|x, y| x + y, 0.0, &a, &[2], None).unwrap_err(),
            TesselError::InvalidAxis { axis: 2, ndim: 2 }
        );
    }

    #[test]
    fn test_reduce_out_rank_too_large() {
        let a = Tensor::zeros(&[3]);
        let out = Tensor::zeros(&[1, 1]);
        assert_eq!(
            SimpleOps.reduce(|x, y| x + y, 0.0, &a, &[0], Some(&out)).unwrap_err(),
            TesselError::RankMismatch { expected: 1, got: 2 }
        );
    }

    #[test]
    fn test_reduce_out_incompatible_dim() {
        let a = Tensor::zeros(&[2, 3]);
        let out = Tensor::zeros(&[2, 2]);
        assert!(matches!(
            SimpleOps.reduce(|x, y| x + y, 0.0, &a, &[], Some(&out)),
            Err(TesselError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reduce_empty_dims_applies_start() {
        let a = Tensor::from_f64(&[1.0, 2.0], &[2]);
        let out = SimpleOps.reduce(|x, y| x + y, 10.0, &a, &[], None).unwrap();
        assert_eq!(out.shape().dims(), &[2]);
        assert_eq!(out.to_vec(), vec![11.0, 12.0]);
    }

    #[test]
    fn test_reduce_into_own_storage() {
        // out is a one-element view at the head of a's own buffer
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0], &[3]);
        let head = Tensor::from_parts(a.storage().clone(), &[1], &[1], 0).unwrap();
        SimpleOps.reduce(|x, y| x + y, 0.0, &a, &[0], Some(&head)).unwrap();
        // 1.0 (seed) + 1 + 2 + 3, read from the snapshot
        assert_eq!(a.to_vec(), vec![7.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parallel_matches_simple() {
        let par = ParallelOps::with_threshold(1);
        let a = Tensor::rand_uniform(&[6, 7, 8], -1.0, 1.0);
        let b = Tensor::rand_uniform(&[7, 1], -1.0, 1.0);

        let s = SimpleOps.zip(|x, y| x * y + 1.0, &a, &b).unwrap();
        let p = par.zip(|x, y| x * y + 1.0, &a, &b).unwrap();
        assert_eq!(s.to_vec(), p.to_vec());

        let s = SimpleOps.map(f64::exp, &a.permute(&[2, 0, 1]).unwrap(), None).unwrap();
        let p = par.map(f64::exp, &a.permute(&[2, 0, 1]).unwrap(), None).unwrap();
        assert_eq!(s.to_vec(), p.to_vec());

        let s = SimpleOps.reduce(|x, y| x + y, 0.0, &a, &[0, 2], None).unwrap();
        let p = par.reduce(|x, y| x + y, 0.0, &a, &[0, 2], None).unwrap();
        assert_eq!(s.shape(), p.shape());
        assert_eq!(s.to_vec(), p.to_vec());
    }

    #[test]
    fn test_parallel_from_config_with_pool() {
        let config = KernelConfig {
            parallel_threshold: 4,
            num_threads: Some(2),
        };
        let par = ParallelOps::from_config(&config).unwrap();
        assert_eq!(par.threshold(), 4);

        let a = Tensor::arange(0.0, 32.0, 1.0).view(&[4, 8]).unwrap();
        let out = par.reduce(|x, y| x.max(y), f64::NEG_INFINITY, &a, &[1], None).unwrap();
        assert_eq!(out.to_vec(), vec![7.0, 15.0, 23.0, 31.0]);

        let bad = KernelConfig {
            parallel_threshold: 4,
            num_threads: Some(0),
        };
        assert!(ParallelOps::from_config(&bad).is_err());
    }
}
