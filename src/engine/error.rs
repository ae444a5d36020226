use thiserror::Error;

/// Shape and index violations raised by [`crate::engine::tensor::Tensor`].
///
/// Every violation is raised at the point it occurs and terminates the
/// current forward/backward call; nothing in the engine retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    #[error("index has {got} components but tensor rank is {rank}")]
    IndexRank { rank: usize, got: usize },

    #[error("index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        dim: usize,
        index: usize,
        size: usize,
    },

    #[error("shape {shape:?} contains a zero dimension")]
    ZeroDim { shape: Vec<usize> },

    #[error("cannot reshape {len} elements into shape {requested:?}")]
    Reshape { len: usize, requested: Vec<usize> },

    #[error("element count mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Errors raised by layers and by [`crate::engine::network::Network`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Input channel count disagrees with the configured kernel channels.
    /// This is a hard error; the caller must align shapes before calling.
    #[error("input has {actual} channels but kernels expect {expected}")]
    ChannelMismatch { expected: usize, actual: usize },
}

impl LayerError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        LayerError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
