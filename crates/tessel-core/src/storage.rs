use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared, reference-counted tensor storage.
///
/// Cloning a `Storage` clones the handle, not the data: every tensor view
/// built from the same storage reads and writes the same buffer, so a write
/// through one view is visible through all of them. Use [`Storage::deep_clone`]
/// for an independent copy.
///
/// Access goes through a `parking_lot::RwLock`. Holding a read guard and
/// requesting a write guard on the same storage from one thread deadlocks;
/// the op wrappers check [`Storage::ptr_eq`] before locking.
#[derive(Debug, Clone)]
pub struct Storage {
    data: Arc<RwLock<Vec<f64>>>,
}

impl Storage {
    /// Allocate `numel` zeros.
    pub fn zeros(numel: usize) -> Self {
        Self::from_vec(vec![0.0; numel])
    }

    /// Allocate `numel` copies of `value`.
    pub fn full(numel: usize, value: f64) -> Self {
        Self::from_vec(vec![value; numel])
    }

    /// Take ownership of an existing buffer.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Create storage from a slice of f64 values.
    pub fn from_f64(data: &[f64]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Number of elements in the buffer.
    pub(crate) fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<f64>> {
        self.data.read()
    }

    /// Exclusive write access. Visible through every handle to this storage.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<f64>> {
        self.data.write()
    }

    /// Copy of the buffer contents.
    pub fn snapshot(&self) -> Vec<f64> {
        self.data.read().clone()
    }

    /// Independent storage holding a copy of this buffer.
    pub fn deep_clone(&self) -> Self {
        Self::from_vec(self.snapshot())
    }

    /// Whether two handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}
