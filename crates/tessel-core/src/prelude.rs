//! Convenience re-exports for common tessel-core types.
//!
//! ```rust
//! use tessel_core::prelude::*;
//! ```

pub use crate::ops::{ParallelOps, SimpleOps, TensorOps};
pub use crate::KernelConfig;
pub use crate::Result;
pub use crate::Shape;
pub use crate::Tensor;
pub use crate::TesselError;
