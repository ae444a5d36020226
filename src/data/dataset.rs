use crate::engine::tensor::Tensor;

/// One training example: a `[1, rows, cols]` input with pixel values
/// normalized to [0, 1], and a one-hot `[classes]` label vector.
#[derive(Debug, Clone)]
pub struct Sample {
    pub input: Tensor,
    pub label: Tensor,
}

pub trait Dataset {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> &Sample;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
