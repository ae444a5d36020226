use log::trace;

use crate::engine::activation::Activation;
use crate::engine::error::{LayerError, TensorError};
use crate::engine::tensor::Tensor;

/// Parameter gradients produced by one backward pass over a [`Conv`]
/// layer.
#[derive(Debug, Clone)]
pub struct ConvGradients {
    /// [num_kernels, channels, kernel_height, kernel_width]
    pub kernels: Tensor,
    /// [num_kernels]
    pub biases: Tensor,
}

/// 2D convolution layer with a fused ReLU.
///
/// The forward pass is a cross-correlation (no kernel flip):
/// `out[k,oy,ox] = relu(sum_{c,ky,kx} input[c, oy*s+ky-p, ox*s+kx-p]
///                       * kernels[k,c,ky,kx] + biases[k])`
/// where positions outside the input count as zero padding.
///
/// kernels: [num_kernels, channels, kh, kw], He-initialized over
/// `channels*kh*kw`. biases: [num_kernels], zero-initialized.
#[derive(Debug, Clone)]
pub struct Conv {
    num_kernels: usize,
    channels: usize,
    kernel_height: usize,
    kernel_width: usize,
    kernels: Tensor,
    biases: Tensor,
    stride: usize,
    padding: usize,
    last_input: Option<Tensor>,
    last_preactivation: Option<Tensor>,
    output_height: usize,
    output_width: usize,
}

impl Conv {
    pub fn new(
        num_kernels: usize,
        channels: usize,
        kernel_height: usize,
        kernel_width: usize,
    ) -> Result<Self, LayerError> {
        if num_kernels == 0 || channels == 0 || kernel_height == 0 || kernel_width == 0 {
            return Err(LayerError::invalid(format!(
                "conv layer needs positive dimensions, got {num_kernels} kernels of \
                 [{channels}, {kernel_height}, {kernel_width}]"
            )));
        }
        let mut kernels = Tensor::new(&[num_kernels, channels, kernel_height, kernel_width])?;
        kernels.init_he(channels * kernel_height * kernel_width);
        let biases = Tensor::new(&[num_kernels])?;
        Ok(Self {
            num_kernels,
            channels,
            kernel_height,
            kernel_width,
            kernels,
            biases,
            stride: 1,
            padding: 0,
            last_input: None,
            last_preactivation: None,
            output_height: 0,
            output_width: 0,
        })
    }

    fn output_dims(&self, height: usize, width: usize) -> Result<(usize, usize), LayerError> {
        let h = (height as isize - self.kernel_height as isize + 2 * self.padding as isize)
            / self.stride as isize
            + 1;
        let w = (width as isize - self.kernel_width as isize + 2 * self.padding as isize)
            / self.stride as isize
            + 1;
        if h < 1 || w < 1 {
            return Err(LayerError::invalid(format!(
                "conv output dimensions {h}x{w} for input {height}x{width}, \
                 kernel {}x{}, stride {}, padding {}",
                self.kernel_height, self.kernel_width, self.stride, self.padding
            )));
        }
        Ok((h as usize, w as usize))
    }

    /// Maps an output position and kernel offset back to input
    /// coordinates; None when the position falls in the padding region.
    fn input_pos(&self, o: usize, k: usize, limit: usize) -> Option<usize> {
        let i = (o * self.stride + k) as isize - self.padding as isize;
        (i >= 0 && (i as usize) < limit).then_some(i as usize)
    }

    /// Cross-correlate the input [C,H,W] into [num_kernels, H_out, W_out],
    /// ReLU applied. Caches the raw input and the pre-activation map.
    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.rank() != 3 {
            return Err(LayerError::invalid(format!(
                "conv input must be rank 3, got shape {:?}",
                input.shape()
            )));
        }
        let (c_in, h_in, w_in) = (input.size(0), input.size(1), input.size(2));
        if c_in != self.channels {
            return Err(LayerError::ChannelMismatch {
                expected: self.channels,
                actual: c_in,
            });
        }
        let (h_out, w_out) = self.output_dims(h_in, w_in)?;
        self.output_height = h_out;
        self.output_width = w_out;
        trace!(
            "conv forward: [{c_in}, {h_in}, {w_in}] -> [{}, {h_out}, {w_out}]",
            self.num_kernels
        );

        let mut pre = Tensor::new(&[self.num_kernels, h_out, w_out])?;
        for k in 0..self.num_kernels {
            for oy in 0..h_out {
                for ox in 0..w_out {
                    let mut sum = 0.0;
                    for c in 0..self.channels {
                        for ky in 0..self.kernel_height {
                            let Some(iy) = self.input_pos(oy, ky, h_in) else {
                                continue;
                            };
                            for kx in 0..self.kernel_width {
                                let Some(ix) = self.input_pos(ox, kx, w_in) else {
                                    continue;
                                };
                                sum += input.get(&[c, iy, ix])?
                                    * self.kernels.get(&[k, c, ky, kx])?;
                            }
                        }
                    }
                    pre.set(sum + self.biases.get(&[k])?, &[k, oy, ox])?;
                }
            }
        }

        let mut output = pre.clone();
        output.map(|x| Activation::Relu.apply(x));

        self.last_input = Some(input.clone());
        self.last_preactivation = Some(pre);
        Ok(output)
    }

    /// Pure gradient computation from the cached forward pass.
    ///
    /// Returns the input gradient [C,H,W] together with the kernel and
    /// bias gradients. Four steps:
    /// 1. gate the output gradient on the cached pre-activation sign,
    /// 2. scatter the gated gradient through the kernels back onto input
    ///    positions (the inverse of the forward index walk; equivalent to
    ///    a full convolution with each kernel rotated 180 degrees),
    /// 3. reduce the gated gradient per filter for the bias gradient,
    /// 4. correlate the cached input with the gated gradient for the
    ///    kernel gradient.
    pub fn gradients(&self, delta_out: &Tensor) -> Result<(Tensor, ConvGradients), LayerError> {
        let input = self
            .last_input
            .as_ref()
            .ok_or_else(|| LayerError::invalid("conv backward called before any forward"))?;
        let pre = self
            .last_preactivation
            .as_ref()
            .ok_or_else(|| LayerError::invalid("conv backward called before any forward"))?;
        let (h_out, w_out) = (self.output_height, self.output_width);
        if delta_out.shape() != [self.num_kernels, h_out, w_out] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.num_kernels, h_out, w_out],
                actual: delta_out.shape().to_vec(),
            }
            .into());
        }
        let (c_in, h_in, w_in) = (input.size(0), input.size(1), input.size(2));

        // ReLU gate: zero where the pre-activation sum was <= 0.
        let mut gated = Tensor::new(&[self.num_kernels, h_out, w_out])?;
        for k in 0..self.num_kernels {
            for oy in 0..h_out {
                for ox in 0..w_out {
                    let open = pre.get(&[k, oy, ox])? > 0.0;
                    let d = if open { delta_out.get(&[k, oy, ox])? } else { 0.0 };
                    gated.set(d, &[k, oy, ox])?;
                }
            }
        }

        // Input gradient: every output position scatters back onto the
        // input window it was computed from, accumulating across filters.
        let mut delta_i = Tensor::new(&[c_in, h_in, w_in])?;
        for k in 0..self.num_kernels {
            for oy in 0..h_out {
                for ox in 0..w_out {
                    let d = gated.get(&[k, oy, ox])?;
                    for c in 0..c_in {
                        for ky in 0..self.kernel_height {
                            let Some(iy) = self.input_pos(oy, ky, h_in) else {
                                continue;
                            };
                            for kx in 0..self.kernel_width {
                                let Some(ix) = self.input_pos(ox, kx, w_in) else {
                                    continue;
                                };
                                delta_i.inc(d * self.kernels.get(&[k, c, ky, kx])?, &[c, iy, ix])?;
                            }
                        }
                    }
                }
            }
        }

        // Bias gradient: spatial reduction per filter.
        let mut delta_b = Tensor::new(&[self.num_kernels])?;
        for k in 0..self.num_kernels {
            for oy in 0..h_out {
                for ox in 0..w_out {
                    delta_b.inc(gated.get(&[k, oy, ox])?, &[k])?;
                }
            }
        }

        // Kernel gradient: correlation of the cached input with the gated
        // gradient; padding positions contribute nothing.
        let mut delta_f = Tensor::new(&[self.num_kernels, c_in, self.kernel_height, self.kernel_width])?;
        for k in 0..self.num_kernels {
            for c in 0..c_in {
                for y in 0..self.kernel_height {
                    for x in 0..self.kernel_width {
                        let mut sum = 0.0;
                        for oy in 0..h_out {
                            let Some(iy) = self.input_pos(oy, y, h_in) else {
                                continue;
                            };
                            for ox in 0..w_out {
                                let Some(ix) = self.input_pos(ox, x, w_in) else {
                                    continue;
                                };
                                sum += input.get(&[c, iy, ix])? * gated.get(&[k, oy, ox])?;
                            }
                        }
                        delta_f.set(sum, &[k, c, y, x])?;
                    }
                }
            }
        }

        Ok((
            delta_i,
            ConvGradients {
                kernels: delta_f,
                biases: delta_b,
            },
        ))
    }

    /// Fixed-step gradient descent: `param -= learning_rate * grad`.
    pub fn apply_gradients(
        &mut self,
        grads: &ConvGradients,
        learning_rate: f64,
    ) -> Result<(), LayerError> {
        if grads.kernels.shape() != self.kernels.shape()
            || grads.biases.shape() != self.biases.shape()
        {
            return Err(TensorError::ShapeMismatch {
                expected: self.kernels.shape().to_vec(),
                actual: grads.kernels.shape().to_vec(),
            }
            .into());
        }
        for (w, g) in self.kernels.data_mut().iter_mut().zip(grads.kernels.data()) {
            *w -= learning_rate * g;
        }
        for (b, g) in self.biases.data_mut().iter_mut().zip(grads.biases.data()) {
            *b -= learning_rate * g;
        }
        Ok(())
    }

    /// One backward step: gate, compute the three gradients, update
    /// kernels and biases in place, return the input gradient [C,H,W].
    pub fn backward(
        &mut self,
        delta_out: &Tensor,
        learning_rate: f64,
    ) -> Result<Tensor, LayerError> {
        let (delta_i, grads) = self.gradients(delta_out)?;
        self.apply_gradients(&grads, learning_rate)?;
        Ok(delta_i)
    }

    pub fn num_kernels(&self) -> usize {
        self.num_kernels
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn set_stride(&mut self, stride: usize) -> Result<(), LayerError> {
        if stride == 0 {
            return Err(LayerError::invalid("conv stride must be positive"));
        }
        self.stride = stride;
        Ok(())
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn set_padding(&mut self, padding: usize) {
        self.padding = padding;
    }

    pub fn kernels(&self) -> &Tensor {
        &self.kernels
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    pub fn set_kernels(&mut self, kernels: Tensor) -> Result<(), LayerError> {
        if kernels.shape() != self.kernels.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.kernels.shape().to_vec(),
                actual: kernels.shape().to_vec(),
            }
            .into());
        }
        self.kernels = kernels;
        Ok(())
    }

    pub fn set_biases(&mut self, biases: Tensor) -> Result<(), LayerError> {
        if biases.shape() != [self.num_kernels] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.num_kernels],
                actual: biases.shape().to_vec(),
            }
            .into());
        }
        self.biases = biases;
        Ok(())
    }
}
