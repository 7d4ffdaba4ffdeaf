//! Reduction operations: sum, prod, mean, max, min.
//!
//! Every reduction keeps the input's rank; reduced dims become size 1.

use smallvec::SmallVec;

use crate::ops::{map, reduce};
use crate::tensor::Tensor;
use crate::{Result, TesselError};

impl Tensor {
    /// Sum along `dims`.
    pub fn sum_dims(&self, dims: &[usize]) -> Result<Tensor> {
        reduce(|acc, x| acc + x, 0.0, self, dims, None)
    }

    /// Product along `dims`.
    pub fn prod_dims(&self, dims: &[usize]) -> Result<Tensor> {
        reduce(|acc, x| acc * x, 1.0, self, dims, None)
    }

    /// Maximum along `dims`. Starts from -inf so all-negative inputs reduce
    /// to their true maximum.
    pub fn max_dims(&self, dims: &[usize]) -> Result<Tensor> {
        reduce(f64::max, f64::NEG_INFINITY, self, dims, None)
    }

    /// Minimum along `dims`.
    pub fn min_dims(&self, dims: &[usize]) -> Result<Tensor> {
        reduce(f64::min, f64::INFINITY, self, dims, None)
    }

    /// Mean along `dims`.
    pub fn mean_dims(&self, dims: &[usize]) -> Result<Tensor> {
        let ndim = self.ndim();
        let mut seen: SmallVec<[bool; 8]> = SmallVec::from_elem(false, ndim);
        let mut count = 1usize;
        for &d in dims {
            let size = self
                .shape()
                .dim(d)
                .ok_or(TesselError::InvalidAxis { axis: d, ndim })?;
            // a repeated dim is reduced once
            if !seen[d] {
                seen[d] = true;
                count *= size;
            }
        }
        let n = count as f64;
        map(move |x| x / n, &self.sum_dims(dims)?, None)
    }

    /// Sum of every element, as a shape-`[1]` tensor.
    pub fn sum_all(&self) -> Result<Tensor> {
        let flat = self.contiguous().view(&[self.numel()])?;
        flat.sum_dims(&[0])
    }
}

#[cfg(test)]
mod tests {
    use crate::Tensor;

    #[test]
    fn test_sum_dims() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let s0 = a.sum_dims(&[0]).unwrap();
        assert_eq!(s0.shape().dims(), &[1, 3]);
        assert_eq!(s0.to_vec(), vec![5.0, 7.0, 9.0]);

        let s1 = a.sum_dims(&[1]).unwrap();
        assert_eq!(s1.shape().dims(), &[2, 1]);
        assert_eq!(s1.to_vec(), vec![6.0, 15.0]);

        let both = a.sum_dims(&[0, 1]).unwrap();
        assert_eq!(both.shape().dims(), &[1, 1]);
        assert_eq!(both.to_vec(), vec![21.0]);
    }

    #[test]
    fn test_sum_of_transposed_view() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let t = a.transpose().unwrap();
        assert_eq!(t.sum_dims(&[1]).unwrap().to_vec(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_prod_dims() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        assert_eq!(a.prod_dims(&[1]).unwrap().to_vec(), vec![2.0, 12.0]);
    }

    #[test]
    fn test_max_of_negative_input() {
        let a = Tensor::from_f64(&[-3.0, -1.0, -2.0], &[3]);
        assert_eq!(a.max_dims(&[0]).unwrap().to_vec(), vec![-1.0]);

        // A start value of 0.0 leaks into the result.
        let wrong = crate::ops::reduce(f64::max, 0.0, &a, &[0], None).unwrap();
        assert_eq!(wrong.to_vec(), vec![0.0]);
    }

    #[test]
    fn test_min_dims() {
        let a = Tensor::from_f64(&[3.0, 1.0, 2.0, 5.0, 9.0, 4.0], &[2, 3]);
        assert_eq!(a.min_dims(&[1]).unwrap().to_vec(), vec![1.0, 4.0]);
        assert_eq!(a.min_dims(&[0]).unwrap().to_vec(), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_mean_dims() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let m = a.mean_dims(&[1]).unwrap();
        assert_eq!(m.shape().dims(), &[2, 1]);
        assert_eq!(m.to_vec(), vec![2.0, 5.0]);
        assert!(a.mean_dims(&[2]).is_err());
    }

    #[test]
    fn test_mean_dims_repeated_dim_counts_once() {
        let a = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        assert_eq!(a.sum_dims(&[0, 0]).unwrap().to_vec(), vec![5.0, 7.0, 9.0]);
        let m = a.mean_dims(&[0, 0]).unwrap();
        assert_eq!(m.shape().dims(), &[1, 3]);
        assert_eq!(m.to_vec(), vec![2.5, 3.5, 4.5]);
        assert_eq!(a.mean_dims(&[1, 0, 1]).unwrap().to_vec(), vec![3.5]);
    }

    #[test]
    fn test_sum_all() {
        let a = Tensor::arange(0.0, 24.0, 1.0).view(&[2, 3, 4]).unwrap();
        let p = a.permute(&[2, 0, 1]).unwrap();
        let s = p.sum_all().unwrap();
        assert_eq!(s.shape().dims(), &[1]);
        assert_eq!(s.to_vec(), vec![276.0]);

        assert_eq!(Tensor::scalar(4.5).sum_all().unwrap().to_vec(), vec![4.5]);
    }
}
