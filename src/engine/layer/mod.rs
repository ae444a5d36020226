use crate::engine::error::LayerError;
use crate::engine::tensor::Tensor;

pub mod conv;
pub mod dense;
pub mod flatten;
pub mod pooling;

pub use conv::{Conv, ConvGradients};
pub use dense::{Dense, DenseGradients};
pub use flatten::Flatten;
pub use pooling::MaxPool;

/// The closed set of layer variants the engine knows about.
///
/// Each variant owns its learnable parameters (if any) plus the transient
/// caches its backward pass needs. Dispatch is an exhaustive match, so
/// adding a variant forces every call site to handle it.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
    Conv(Conv),
    Flatten(Flatten),
    MaxPool(MaxPool),
}

impl Layer {
    /// Run the layer's forward transform, caching whatever the matching
    /// backward pass needs.
    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        match self {
            Layer::Dense(l) => l.forward(input),
            Layer::Conv(l) => l.forward(input),
            Layer::Flatten(l) => l.forward(input),
            Layer::MaxPool(l) => l.forward(input),
        }
    }

    /// Propagate a gradient backwards and, for layers with parameters,
    /// apply the in-place gradient-descent update. Must be paired with
    /// the most recent `forward` call on this layer.
    pub fn backward(&mut self, delta: &Tensor, learning_rate: f64) -> Result<Tensor, LayerError> {
        match self {
            Layer::Dense(l) => l.backward(delta, learning_rate),
            Layer::Conv(l) => l.backward(delta, learning_rate),
            Layer::Flatten(l) => l.backward(delta),
            Layer::MaxPool(l) => l.backward(delta),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layer::Dense(_) => "dense",
            Layer::Conv(_) => "conv",
            Layer::Flatten(_) => "flatten",
            Layer::MaxPool(_) => "max_pool",
        }
    }
}

impl From<Dense> for Layer {
    fn from(l: Dense) -> Self {
        Layer::Dense(l)
    }
}

impl From<Conv> for Layer {
    fn from(l: Conv) -> Self {
        Layer::Conv(l)
    }
}

impl From<Flatten> for Layer {
    fn from(l: Flatten) -> Self {
        Layer::Flatten(l)
    }
}

impl From<MaxPool> for Layer {
    fn from(l: MaxPool) -> Self {
        Layer::MaxPool(l)
    }
}
