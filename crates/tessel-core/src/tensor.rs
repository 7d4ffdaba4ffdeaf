use std::fmt;

use smallvec::SmallVec;

use crate::error::TesselError;
use crate::index::{count, index_to_position, IndexBuf, MAX_DIMS};
use crate::kernel::{self, StridedMut, StridedRef};
use crate::shape::{Shape, Strides};
use crate::storage::Storage;
use crate::Result;

/// A strided view over shared `f64` storage.
///
/// A tensor is a lightweight handle: shape, strides and a starting offset into
/// a reference-counted buffer. Views created with [`Tensor::view`],
/// [`Tensor::permute`] or [`Tensor::transpose`] share the buffer with the
/// tensor they came from, and writes through any of them (including kernel
/// outputs) are visible through all of them.
///
/// # Examples
///
/// ```
/// use tessel_core::Tensor;
///
/// let t = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
/// assert_eq!(t.shape().dims(), &[2, 3]);
///
/// // Transpose is a zero-copy view
/// let tr = t.transpose().unwrap();
/// assert_eq!(tr.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: Strides,
    offset: usize,
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a tensor from f64 data with the given shape.
    ///
    /// # Panics
    /// Panics if the data length does not match the shape or the rank exceeds
    /// [`MAX_DIMS`].
    pub fn from_f64(data: &[f64], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert!(
            s.ndim() <= MAX_DIMS,
            "rank {} exceeds MAX_DIMS ({})",
            s.ndim(),
            MAX_DIMS
        );
        assert_eq!(
            s.numel(),
            data.len(),
            "Shape {:?} requires {} elements, got {}",
            shape,
            s.numel(),
            data.len()
        );
        Self::contiguous_over(Storage::from_f64(data), s)
    }

    /// Fallible counterpart of [`Tensor::from_f64`] that takes ownership of `data`.
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> Result<Self> {
        let s = Shape::new(shape);
        s.check_rank()?;
        if s.numel() != data.len() {
            return Err(TesselError::ShapeMismatch {
                expected: vec![s.numel()],
                got: vec![data.len()],
            });
        }
        Ok(Self::contiguous_over(Storage::from_vec(data), s))
    }

    /// Create a tensor of zeros with the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    /// Create a tensor of ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// Create a tensor with every element set to `value`.
    pub fn full(shape: &[usize], value: f64) -> Self {
        let s = Shape::new(shape);
        assert!(
            s.ndim() <= MAX_DIMS,
            "rank {} exceeds MAX_DIMS ({})",
            s.ndim(),
            MAX_DIMS
        );
        Self::contiguous_over(Storage::full(s.numel(), value), s)
    }

    /// Create a scalar tensor from a single value.
    pub fn scalar(value: f64) -> Self {
        Self::contiguous_over(Storage::from_f64(&[value]), Shape::scalar())
    }

    /// Create a 1-D tensor with values from `start` to `end` (exclusive).
    ///
    /// # Panics
    /// Panics if `step` is zero or if `step` direction doesn't match `start`→`end`.
    pub fn arange(start: f64, end: f64, step: f64) -> Self {
        assert!(step != 0.0, "arange: step must be non-zero");
        assert!(
            (end - start) * step > 0.0 || (end - start).abs() < f64::EPSILON,
            "arange: step direction ({}) does not match start ({}) → end ({})",
            step,
            start,
            end
        );
        let mut data = Vec::new();
        let mut v = start;
        if step > 0.0 {
            while v < end {
                data.push(v);
                v += step;
            }
        } else {
            while v > end {
                data.push(v);
                v += step;
            }
        }
        let len = data.len();
        Self::from_f64(&data, &[len])
    }

    /// Create a tensor with random values uniformly distributed in [low, high).
    pub fn rand_uniform(shape: &[usize], low: f64, high: f64) -> Self {
        use rand::Rng;
        let s = Shape::new(shape);
        let mut rng = rand::thread_rng();
        let data: Vec<f64> = (0..s.numel()).map(|_| rng.gen_range(low..high)).collect();
        Self::from_f64(&data, shape)
    }

    /// Build a view over existing storage with explicit strides and offset.
    ///
    /// Fails if the rank is too large, the strides do not match the shape, or
    /// the furthest addressed element lies outside the storage.
    pub fn from_parts(
        storage: Storage,
        shape: &[usize],
        strides: &[usize],
        offset: usize,
    ) -> Result<Self> {
        let s = Shape::new(shape);
        s.check_rank()?;
        if strides.len() != shape.len() {
            return Err(TesselError::RankMismatch {
                expected: shape.len(),
                got: strides.len(),
            });
        }
        if s.numel() > 0 {
            let last: usize = shape
                .iter()
                .zip(strides)
                .map(|(&d, &st)| (d - 1) * st)
                .sum();
            let len = storage.len();
            if offset + last >= len {
                return Err(TesselError::ShapeMismatch {
                    expected: vec![offset + last + 1],
                    got: vec![len],
                });
            }
        }
        Ok(Self {
            storage,
            shape: s,
            strides: SmallVec::from_slice(strides),
            offset,
        })
    }

    fn contiguous_over(storage: Storage, shape: Shape) -> Self {
        let strides = shape.contiguous_strides();
        Self {
            storage,
            shape,
            strides,
            offset: 0,
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Shape of the tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Strides (in elements).
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Offset of the first element in the storage.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The shared backing storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Whether this tensor is contiguous in memory (row-major).
    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides()
    }

    /// Whether `self` and `other` are views of the same buffer.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// Element at a multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        let pos = self.checked_position(index)?;
        Ok(self.storage.read()[pos])
    }

    /// Overwrite the element at a multi-dimensional index.
    pub fn set(&self, index: &[usize], value: f64) -> Result<()> {
        let pos = self.checked_position(index)?;
        self.storage.write()[pos] = value;
        Ok(())
    }

    fn checked_position(&self, index: &[usize]) -> Result<usize> {
        let in_bounds = index.len() == self.ndim()
            && index.iter().zip(self.shape.dims()).all(|(&i, &d)| i < d);
        if !in_bounds {
            return Err(TesselError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.dims().to_vec(),
            });
        }
        Ok(self.offset + index_to_position(index, &self.strides))
    }

    /// Elements in logical row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        let data = self.storage.read();
        let dims = self.shape.dims();
        let mut idx: IndexBuf = [0; MAX_DIMS];
        (0..self.numel())
            .map(|pos| {
                count(pos, dims, &mut idx);
                data[self.offset + index_to_position(&idx[..dims.len()], &self.strides)]
            })
            .collect()
    }

    /// Iterate over every multi-index of this tensor in row-major order.
    pub fn indices(&self) -> Indices {
        Indices {
            shape: self.shape.clone(),
            pos: 0,
            numel: self.numel(),
        }
    }

    /// Set every element of this view to `value`.
    pub fn fill(&self, value: f64) {
        let mut data = self.storage.write();
        let dims = self.shape.dims();
        let mut idx: IndexBuf = [0; MAX_DIMS];
        for pos in 0..self.numel() {
            count(pos, dims, &mut idx);
            data[self.offset + index_to_position(&idx[..dims.len()], &self.strides)] = value;
        }
    }

    // =========================================================================
    // Shape operations (zero-copy views)
    // =========================================================================

    /// View the same elements under a new shape (contiguous tensors only).
    pub fn view(&self, shape: &[usize]) -> Result<Tensor> {
        let s = Shape::new(shape);
        s.check_rank()?;
        if s.numel() != self.numel() {
            return Err(TesselError::InvalidReshape {
                numel: self.numel(),
                shape: shape.to_vec(),
            });
        }
        if !self.is_contiguous() {
            return Err(TesselError::NonContiguous);
        }
        let strides = s.contiguous_strides();
        Ok(Tensor {
            storage: self.storage.clone(), // Arc clone, shared data
            shape: s,
            strides,
            offset: self.offset,
        })
    }

    /// Reorder dimensions: output dim `i` is input dim `order[i]`.
    pub fn permute(&self, order: &[usize]) -> Result<Tensor> {
        let ndim = self.ndim();
        if order.len() != ndim {
            return Err(TesselError::RankMismatch {
                expected: ndim,
                got: order.len(),
            });
        }
        let mut seen: SmallVec<[bool; 8]> = SmallVec::from_elem(false, ndim);
        for &axis in order {
            if axis >= ndim || seen[axis] {
                return Err(TesselError::InvalidAxis { axis, ndim });
            }
            seen[axis] = true;
        }

        let dims: Vec<usize> = order.iter().map(|&a| self.shape.dims()[a]).collect();
        Ok(Tensor {
            storage: self.storage.clone(),
            shape: Shape::from(dims),
            strides: order.iter().map(|&a| self.strides[a]).collect(),
            offset: self.offset,
        })
    }

    /// Transpose the last two dimensions (zero-copy view).
    pub fn transpose(&self) -> Result<Tensor> {
        let new_shape = self.shape.transpose().ok_or(TesselError::InvalidAxis {
            axis: 0,
            ndim: self.ndim(),
        })?;

        let ndim = self.ndim();
        let mut new_strides = self.strides.clone();
        new_strides.swap(ndim - 2, ndim - 1);

        Ok(Tensor {
            storage: self.storage.clone(),
            shape: new_shape,
            strides: new_strides,
            offset: self.offset,
        })
    }

    /// View with `n` leading size-1 dimensions. Element order and count are
    /// unchanged and storage is shared.
    pub(crate) fn with_leading_ones(&self, n: usize) -> Tensor {
        let numel = self.numel();
        let mut strides: Strides = SmallVec::from_elem(numel, n);
        strides.extend_from_slice(&self.strides);
        Tensor {
            storage: self.storage.clone(),
            shape: self.shape.with_leading_ones(n),
            strides,
            offset: self.offset,
        }
    }

    /// Return a contiguous copy of this tensor if it isn't already contiguous.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }
        let out = Tensor::zeros(self.shape.dims());
        {
            let src = self.storage.read();
            let mut dst = out.storage.write();
            kernel::tensor_map(
                StridedMut::new(&mut dst[..], out.shape.dims(), &out.strides),
                StridedRef::new(&src[self.offset..], self.shape.dims(), &self.strides),
                |x| x,
            );
        }
        out
    }
}

/// Row-major iterator over the multi-indices of a shape.
pub struct Indices {
    shape: Shape,
    pos: usize,
    numel: usize,
}

impl Iterator for Indices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.numel {
            return None;
        }
        let mut idx = vec![0; self.shape.ndim()];
        count(self.pos, self.shape.dims(), &mut idx);
        self.pos += 1;
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.numel - self.pos;
        (rem, Some(rem))
    }
}

impl ExactSizeIterator for Indices {}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, strides={:?}, offset={}, contiguous={})",
            self.shape,
            self.strides.as_slice(),
            self.offset,
            self.is_contiguous(),
        )
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_vec();
        if data.len() <= 20 {
            write!(f, "tensor({:?}, shape={})", data, self.shape)
        } else {
            write!(
                f,
                "tensor([{:.4}, {:.4}, ..., {:.4}], shape={})",
                data[0],
                data[1],
                data[data.len() - 1],
                self.shape
            )
        }
    }
}
