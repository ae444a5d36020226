use log::trace;

use crate::engine::error::{LayerError, TensorError};
use crate::engine::tensor::Tensor;

/// Max pooling over `pool_height x pool_width` windows.
///
/// No learnable parameters. Windows are strictly in bounds: output dims
/// are `(in - pool) / stride + 1`, so partial windows never occur.
///
/// Forward records the flat arg-max position of every window; backward
/// routes each incoming gradient element to that position and leaves the
/// rest of the input gradient zero.
#[derive(Debug, Clone)]
pub struct MaxPool {
    pool_height: usize,
    pool_width: usize,
    stride: usize,
    input_shape: Option<[usize; 3]>,
    argmax: Vec<usize>,
    output_height: usize,
    output_width: usize,
}

impl MaxPool {
    pub fn new(pool_height: usize, pool_width: usize) -> Result<Self, LayerError> {
        if pool_height == 0 || pool_width == 0 {
            return Err(LayerError::invalid(format!(
                "pool window must be positive, got {pool_height}x{pool_width}"
            )));
        }
        Ok(Self {
            pool_height,
            pool_width,
            stride: 2,
            input_shape: None,
            argmax: Vec::new(),
            output_height: 0,
            output_width: 0,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn set_stride(&mut self, stride: usize) -> Result<(), LayerError> {
        if stride == 0 {
            return Err(LayerError::invalid("pool stride must be positive"));
        }
        self.stride = stride;
        Ok(())
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.rank() != 3 {
            return Err(LayerError::invalid(format!(
                "pool input must be rank 3, got shape {:?}",
                input.shape()
            )));
        }
        let (c_in, h_in, w_in) = (input.size(0), input.size(1), input.size(2));
        let h_out = (h_in as isize - self.pool_height as isize) / self.stride as isize + 1;
        let w_out = (w_in as isize - self.pool_width as isize) / self.stride as isize + 1;
        if h_out < 1 || w_out < 1 {
            return Err(LayerError::invalid(format!(
                "pool output dimensions {h_out}x{w_out} for input {h_in}x{w_in}, \
                 window {}x{}, stride {}",
                self.pool_height, self.pool_width, self.stride
            )));
        }
        let (h_out, w_out) = (h_out as usize, w_out as usize);
        trace!("pool forward: [{c_in}, {h_in}, {w_in}] -> [{c_in}, {h_out}, {w_out}]");

        let mut output = Tensor::new(&[c_in, h_out, w_out])?;
        let mut argmax = vec![0; c_in * h_out * w_out];
        for c in 0..c_in {
            for oy in 0..h_out {
                for ox in 0..w_out {
                    let mut max = f64::NEG_INFINITY;
                    let mut max_pos = 0;
                    for wy in 0..self.pool_height {
                        for wx in 0..self.pool_width {
                            let iy = oy * self.stride + wy;
                            let ix = ox * self.stride + wx;
                            let v = input.get(&[c, iy, ix])?;
                            if v > max {
                                max = v;
                                max_pos = c * h_in * w_in + iy * w_in + ix;
                            }
                        }
                    }
                    output.set(max, &[c, oy, ox])?;
                    argmax[c * h_out * w_out + oy * w_out + ox] = max_pos;
                }
            }
        }

        self.input_shape = Some([c_in, h_in, w_in]);
        self.argmax = argmax;
        self.output_height = h_out;
        self.output_width = w_out;
        Ok(output)
    }

    /// Route each gradient element to the arg-max position its window
    /// selected on the last forward pass; everything else stays zero.
    pub fn backward(&mut self, gradient: &Tensor) -> Result<Tensor, LayerError> {
        let [c_in, h_in, w_in] = self
            .input_shape
            .ok_or_else(|| LayerError::invalid("pool backward called before any forward"))?;
        if gradient.shape() != [c_in, self.output_height, self.output_width] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![c_in, self.output_height, self.output_width],
                actual: gradient.shape().to_vec(),
            }
            .into());
        }
        let mut routed = Tensor::new(&[c_in, h_in, w_in])?;
        for (flat, &pos) in self.argmax.iter().enumerate() {
            routed.data_mut()[pos] += gradient.data()[flat];
        }
        Ok(routed)
    }
}
