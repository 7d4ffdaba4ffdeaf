use thiserror::Error;

/// Errors produced by tensor construction, views and kernel wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TesselError {
    #[error("cannot broadcast shapes {a:?} and {b:?}")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("rank mismatch: expected {expected} dims, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("rank {ndim} exceeds the maximum of {max} dims")]
    RankTooLarge { ndim: usize, max: usize },

    #[error("axis {axis} out of range for {ndim}-D tensor")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("cannot view {numel} elements as shape {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<usize> },

    #[error("operation requires a contiguous tensor")]
    NonContiguous,

    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    #[error("invalid configuration: {0}")]
    Config(String),
}
