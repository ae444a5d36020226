use log::trace;

use crate::engine::activation::Activation;
use crate::engine::error::{LayerError, TensorError};
use crate::engine::tensor::Tensor;

/// Parameter gradients produced by one backward pass over a [`Dense`]
/// layer. Applying them is a separate step, so the update rule is not
/// welded to the gradient computation.
#[derive(Debug, Clone)]
pub struct DenseGradients {
    /// [size, input_size]
    pub weights: Tensor,
    /// [size]
    pub biases: Tensor,
}

/// Fully-connected layer with a fused scalar activation.
///
/// weights: [size, input_size], Xavier-initialized.
/// biases: [size], zero-initialized.
#[derive(Debug, Clone)]
pub struct Dense {
    size: usize,
    input_size: usize,
    weights: Tensor,
    biases: Tensor,
    activation: Activation,
    last_input: Option<Tensor>,
    last_preactivation: Option<Tensor>,
    last_output: Option<Tensor>,
}

impl Dense {
    pub fn new(size: usize, input_size: usize, activation: Activation) -> Result<Self, LayerError> {
        if size == 0 || input_size == 0 {
            return Err(LayerError::invalid(format!(
                "dense layer needs positive sizes, got {size}x{input_size}"
            )));
        }
        let mut weights = Tensor::new(&[size, input_size])?;
        weights.init_xavier(input_size, size);
        let biases = Tensor::new(&[size])?;
        Ok(Self {
            size,
            input_size,
            weights,
            biases,
            activation,
            last_input: None,
            last_preactivation: None,
            last_output: None,
        })
    }

    /// `pre[n] = sum_k input[k] * w[n,k] + b[n]`, `out[n] = act(pre[n])`.
    ///
    /// Caches the input, the pre-activation sums and the output; the
    /// caches are single-slot and overwritten on every call.
    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.shape() != [self.input_size] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.input_size],
                actual: input.shape().to_vec(),
            }
            .into());
        }
        trace!("dense forward: {} -> {}", self.input_size, self.size);

        let mut pre = Tensor::new(&[self.size])?;
        for n in 0..self.size {
            let mut sum = self.biases.get(&[n])?;
            for k in 0..self.input_size {
                sum += input.get(&[k])? * self.weights.get(&[n, k])?;
            }
            pre.set(sum, &[n])?;
        }

        let act = self.activation;
        let mut output = pre.clone();
        output.map(|x| act.apply(x));

        self.last_input = Some(input.clone());
        self.last_preactivation = Some(pre);
        self.last_output = Some(output.clone());
        Ok(output)
    }

    /// Pure gradient computation from the cached forward pass.
    ///
    /// Returns the gradient to propagate to the previous layer together
    /// with this layer's parameter gradients. Nothing is mutated, so the
    /// propagated gradient is always read from pre-update weights.
    pub fn gradients(&self, delta_out: &Tensor) -> Result<(Tensor, DenseGradients), LayerError> {
        let input = self.cached(&self.last_input)?;
        let pre = self.cached(&self.last_preactivation)?;
        let out = self.cached(&self.last_output)?;
        if delta_out.shape() != [self.size] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.size],
                actual: delta_out.shape().to_vec(),
            }
            .into());
        }

        // delta_in[n] = delta_out[n] * act'(pre[n], out[n])
        let mut delta_in = vec![0.0; self.size];
        for n in 0..self.size {
            let d = self.activation.derivative(pre.get(&[n])?, out.get(&[n])?);
            delta_in[n] = delta_out.get(&[n])? * d;
        }

        let mut propagated = Tensor::new(&[self.input_size])?;
        let mut grad_w = Tensor::new(&[self.size, self.input_size])?;
        let mut grad_b = Tensor::new(&[self.size])?;
        for n in 0..self.size {
            grad_b.set(delta_in[n], &[n])?;
            for k in 0..self.input_size {
                propagated.inc(delta_in[n] * self.weights.get(&[n, k])?, &[k])?;
                grad_w.set(delta_in[n] * input.get(&[k])?, &[n, k])?;
            }
        }

        Ok((
            propagated,
            DenseGradients {
                weights: grad_w,
                biases: grad_b,
            },
        ))
    }

    /// Fixed-step gradient descent: `param -= learning_rate * grad`.
    pub fn apply_gradients(
        &mut self,
        grads: &DenseGradients,
        learning_rate: f64,
    ) -> Result<(), LayerError> {
        if grads.weights.shape() != self.weights.shape()
            || grads.biases.shape() != self.biases.shape()
        {
            return Err(TensorError::ShapeMismatch {
                expected: self.weights.shape().to_vec(),
                actual: grads.weights.shape().to_vec(),
            }
            .into());
        }
        for (w, g) in self.weights.data_mut().iter_mut().zip(grads.weights.data()) {
            *w -= learning_rate * g;
        }
        for (b, g) in self.biases.data_mut().iter_mut().zip(grads.biases.data()) {
            *b -= learning_rate * g;
        }
        Ok(())
    }

    /// One backward step: compute gradients against the cached forward
    /// pass, update parameters in place, return the propagated gradient
    /// of shape [input_size].
    pub fn backward(
        &mut self,
        delta_out: &Tensor,
        learning_rate: f64,
    ) -> Result<Tensor, LayerError> {
        let (propagated, grads) = self.gradients(delta_out)?;
        self.apply_gradients(&grads, learning_rate)?;
        Ok(propagated)
    }

    fn cached<'a>(&self, slot: &'a Option<Tensor>) -> Result<&'a Tensor, LayerError> {
        slot.as_ref()
            .ok_or_else(|| LayerError::invalid("dense backward called before any forward"))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    pub fn set_weights(&mut self, weights: Tensor) -> Result<(), LayerError> {
        if weights.shape() != [self.size, self.input_size] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.size, self.input_size],
                actual: weights.shape().to_vec(),
            }
            .into());
        }
        self.weights = weights;
        Ok(())
    }

    pub fn set_biases(&mut self, biases: Tensor) -> Result<(), LayerError> {
        if biases.shape() != [self.size] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.size],
                actual: biases.shape().to_vec(),
            }
            .into());
        }
        self.biases = biases;
        Ok(())
    }
}
