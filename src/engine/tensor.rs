use std::fmt;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::engine::error::TensorError;

/// A dense multi-dimensional array of f64 values.
///
/// The value buffer is flat and row-major; `shape` describes how the
/// buffer is indexed. `data.len() == shape.iter().product()` holds at all
/// times: constructors validate it and `reshape` refuses to break it.
///
/// Every layer in the engine goes through `get`/`set`/`inc`, so the offset
/// computation below is the single source of truth for element layout
/// (kernels, weight matrices and activations all agree on it).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Zero-filled tensor of the given shape.
    pub fn new(shape: &[usize]) -> Result<Self, TensorError> {
        Self::check_shape(shape)?;
        let len = shape.iter().product();
        Ok(Self {
            shape: shape.to_vec(),
            data: vec![0.0; len],
        })
    }

    /// Tensor wrapping an existing flat buffer.
    pub fn with_data(shape: &[usize], data: Vec<f64>) -> Result<Self, TensorError> {
        Self::check_shape(shape)?;
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    fn check_shape(shape: &[usize]) -> Result<(), TensorError> {
        if shape.iter().any(|&d| d == 0) {
            return Err(TensorError::ZeroDim {
                shape: shape.to_vec(),
            });
        }
        Ok(())
    }

    /// Row-major flat offset: walk dimensions last to first, accumulating
    /// `offset += index[d] * stride; stride *= shape[d]`.
    fn offset(&self, index: &[usize]) -> Result<usize, TensorError> {
        if index.len() != self.shape.len() {
            return Err(TensorError::IndexRank {
                rank: self.shape.len(),
                got: index.len(),
            });
        }
        let mut offset = 0;
        let mut stride = 1;
        for d in (0..self.shape.len()).rev() {
            if index[d] >= self.shape[d] {
                return Err(TensorError::IndexOutOfBounds {
                    dim: d,
                    index: index[d],
                    size: self.shape[d],
                });
            }
            offset += index[d] * stride;
            stride *= self.shape[d];
        }
        Ok(offset)
    }

    pub fn get(&self, index: &[usize]) -> Result<f64, TensorError> {
        Ok(self.data[self.offset(index)?])
    }

    pub fn set(&mut self, value: f64, index: &[usize]) -> Result<(), TensorError> {
        let i = self.offset(index)?;
        self.data[i] = value;
        Ok(())
    }

    pub fn inc(&mut self, delta: f64, index: &[usize]) -> Result<(), TensorError> {
        let i = self.offset(index)?;
        self.data[i] += delta;
        Ok(())
    }

    /// Reinterpret the buffer under a new shape. The element count must
    /// not change and every new dimension must be positive.
    pub fn reshape(&mut self, new_shape: &[usize]) -> Result<(), TensorError> {
        Self::check_shape(new_shape)?;
        let product: usize = new_shape.iter().product();
        if product != self.data.len() {
            return Err(TensorError::Reshape {
                len: self.data.len(),
                requested: new_shape.to_vec(),
            });
        }
        self.shape = new_shape.to_vec();
        Ok(())
    }

    /// Apply a pure unary function to every element, in place.
    pub fn map(&mut self, f: impl Fn(f64) -> f64) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// Elementwise difference. Keeps this tensor's shape.
    pub fn subtract(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        if other.data.len() != self.data.len() {
            return Err(TensorError::LengthMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a - b)
            .collect();
        Ok(Tensor {
            shape: self.shape.clone(),
            data,
        })
    }

    // Initializers overwrite every element; none of them is additive.

    pub fn init_zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn init_constant(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Uniform in [-0.5, 0.5).
    pub fn init_random(&mut self) {
        let mut rng = rand::thread_rng();
        for v in &mut self.data {
            *v = rng.gen::<f64>() - 0.5;
        }
    }

    /// Standard normal scaled by 0.1.
    pub fn init_normal(&mut self) {
        let mut rng = rand::thread_rng();
        for v in &mut self.data {
            let z: f64 = rng.sample(StandardNormal);
            *v = z * 0.1;
        }
    }

    /// Xavier: uniform with bound `sqrt(6 / (fan_in + fan_out))`.
    pub fn init_xavier(&mut self, fan_in: usize, fan_out: usize) {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let mut rng = rand::thread_rng();
        for v in &mut self.data {
            *v = rng.gen_range(-bound..bound);
        }
    }

    /// He: normal with std `sqrt(2 / fan_in)`.
    pub fn init_he(&mut self, fan_in: usize) {
        let std = (2.0 / fan_in as f64).sqrt();
        let mut rng = rand::thread_rng();
        for v in &mut self.data {
            let z: f64 = rng.sample(StandardNormal);
            *v = z * std;
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Length of one dimension.
    pub fn size(&self, dim: usize) -> usize {
        self.shape[dim]
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: constructors and `reshape` reject zero dimensions,
    /// so the buffer holds at least one element. Kept to pair with `len`.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{:?} [", self.shape)?;
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.6}", v)?;
        }
        write!(f, "]")
    }
}
