use log::debug;

use crate::engine::error::LayerError;
use crate::engine::layer::Layer;
use crate::engine::tensor::Tensor;

/// An ordered composition of layers sharing one learning rate.
///
/// `forward` folds the input through the layers left to right; `backward`
/// folds a loss gradient right to left, letting each layer update its own
/// parameters as a side effect. Training loops live with the caller; the
/// network itself is a thin structural composition.
#[derive(Debug, Default)]
pub struct Network {
    layers: Vec<Layer>,
    learning_rate: f64,
    verbose: bool,
}

impl Network {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            layers: Vec::new(),
            learning_rate,
            verbose: false,
        }
    }

    /// Enable per-layer tensor dumps through the `log` facade. Scoped to
    /// this network instance; has no effect on numerical results.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn add(&mut self, layer: impl Into<Layer>) {
        self.layers.push(layer.into());
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if self.verbose {
            debug!("forward pass through {} layers", self.layers.len());
        }
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
            if self.verbose {
                debug!("[{}] output: {}", layer.name(), current);
            }
        }
        Ok(current)
    }

    /// Thread a loss gradient back through the layers, updating their
    /// parameters with the shared learning rate. Returns the gradient
    /// with respect to the network's input.
    pub fn backward(&mut self, gradient: &Tensor) -> Result<Tensor, LayerError> {
        let lr = self.learning_rate;
        let mut current = gradient.clone();
        for layer in self.layers.iter_mut().rev() {
            current = layer.backward(&current, lr)?;
            if self.verbose {
                debug!("[{}] propagated gradient: {}", layer.name(), current);
            }
        }
        Ok(current)
    }
}
