/// Scalar activation functions and their paired derivatives.
///
/// Layers cache both the pre-activation sum and the post-activation output
/// per forward pass, and `derivative` receives both; each variant reads
/// the one its closed-form derivative is defined over. Sigmoid and Tanh
/// differentiate through the output (`y(1-y)`, `1-y^2`), Relu gates on the
/// sign of the pre-activation sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Sigmoid,
    Relu,
    Tanh,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }

    pub fn derivative(self, pre: f64, post: f64) -> f64 {
        match self {
            Activation::Sigmoid => post * (1.0 - post),
            Activation::Relu => {
                if pre > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - post * post,
        }
    }
}
