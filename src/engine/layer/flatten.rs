use crate::engine::error::{LayerError, TensorError};
use crate::engine::tensor::Tensor;

/// Shape-only bridge between spatial [C,H,W] tensors and flat vectors.
///
/// Forward flattens row-major (`index = c*H*W + h*W + w`); backward is the
/// exact inverse reshape for any gradient of matching length. No learnable
/// state, no numeric transform.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    input_shape: Option<[usize; 3]>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.rank() != 3 {
            return Err(LayerError::invalid(format!(
                "flatten input must be rank 3, got shape {:?}",
                input.shape()
            )));
        }
        let (c, h, w) = (input.size(0), input.size(1), input.size(2));
        self.input_shape = Some([c, h, w]);

        // Row-major data does not move; only the shape changes.
        let mut output = input.clone();
        output.reshape(&[c * h * w])?;
        Ok(output)
    }

    pub fn backward(&mut self, gradient: &Tensor) -> Result<Tensor, LayerError> {
        let [c, h, w] = self
            .input_shape
            .ok_or_else(|| LayerError::invalid("flatten backward called before any forward"))?;
        if gradient.len() != c * h * w {
            return Err(TensorError::ShapeMismatch {
                expected: vec![c * h * w],
                actual: gradient.shape().to_vec(),
            }
            .into());
        }
        let mut output = gradient.clone();
        output.reshape(&[c, h, w])?;
        Ok(output)
    }
}
