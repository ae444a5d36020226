use lamina::engine::activation::Activation;
use lamina::engine::error::{LayerError, TensorError};
use lamina::engine::layer::Dense;
use lamina::engine::tensor::Tensor;

fn tensor1(vals: &[f64]) -> Tensor {
    Tensor::with_data(&[vals.len()], vals.to_vec()).unwrap()
}

fn tensor2(rows: usize, cols: usize, vals: &[f64]) -> Tensor {
    Tensor::with_data(&[rows, cols], vals.to_vec()).unwrap()
}

#[test]
fn forward_is_weighted_sum_plus_bias() {
    // Relu with all-positive pre-activations behaves as identity, so the
    // affine part can be checked directly.
    let mut layer = Dense::new(2, 3, Activation::Relu).unwrap();
    layer
        .set_weights(tensor2(2, 3, &[1.0, 2.0, 3.0, -1.0, 0.5, 2.0]))
        .unwrap();
    layer.set_biases(tensor1(&[0.1, -0.2])).unwrap();

    let out = layer.forward(&tensor1(&[0.5, -1.0, 2.0])).unwrap();

    // n0: 1*0.5 + 2*(-1) + 3*2 + 0.1 = 4.6
    // n1: -1*0.5 + 0.5*(-1) + 2*2 - 0.2 = 2.8
    assert!((out.get(&[0]).unwrap() - 4.6).abs() < 1e-9);
    assert!((out.get(&[1]).unwrap() - 2.8).abs() < 1e-9);
}

#[test]
fn forward_applies_relu_elementwise() {
    let mut layer = Dense::new(3, 2, Activation::Relu).unwrap();
    layer
        .set_weights(tensor2(3, 2, &[2.0, 1.0, -3.0, -2.0, 0.5, -1.5]))
        .unwrap();
    layer.set_biases(tensor1(&[-1.0, 0.5, 0.25])).unwrap();

    // Pre-activations: 1.0, -3.0, -1.0.
    let out = layer.forward(&tensor1(&[0.5, 1.0])).unwrap();
    assert_eq!(out.data(), &[1.0, 0.0, 0.0]);
}

#[test]
fn forward_applies_sigmoid() {
    let mut layer = Dense::new(2, 2, Activation::Sigmoid).unwrap();
    layer.set_weights(tensor2(2, 2, &[0.0; 4])).unwrap();
    layer.set_biases(tensor1(&[0.0, 0.0])).unwrap();

    let out = layer.forward(&tensor1(&[3.0, -7.0])).unwrap();
    assert!((out.get(&[0]).unwrap() - 0.5).abs() < 1e-9);
    assert!((out.get(&[1]).unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn forward_rejects_wrong_input_size() {
    let mut layer = Dense::new(2, 3, Activation::Sigmoid).unwrap();
    assert!(layer.forward(&tensor1(&[1.0, 2.0])).is_err());
}

#[test]
fn forward_rejects_higher_rank_input_of_matching_length() {
    let mut layer = Dense::new(2, 3, Activation::Sigmoid).unwrap();
    // Same element count as a valid input, wrong rank.
    let column = tensor2(3, 1, &[1.0, 2.0, 3.0]);
    assert!(matches!(
        layer.forward(&column),
        Err(LayerError::Tensor(TensorError::ShapeMismatch { .. }))
    ));

    layer.forward(&tensor1(&[1.0, 2.0, 3.0])).unwrap();
    assert!(matches!(
        layer.backward(&tensor2(2, 1, &[1.0, 1.0]), 0.1),
        Err(LayerError::Tensor(TensorError::ShapeMismatch { .. }))
    ));
}

#[test]
fn backward_before_forward_fails() {
    let mut layer = Dense::new(2, 3, Activation::Sigmoid).unwrap();
    assert!(matches!(
        layer.backward(&tensor1(&[1.0, 1.0]), 0.1),
        Err(LayerError::InvalidConfiguration { .. })
    ));
}

#[test]
fn backward_propagates_through_pre_update_weights() {
    let mut layer = Dense::new(2, 2, Activation::Relu).unwrap();
    layer
        .set_weights(tensor2(2, 2, &[1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    layer.set_biases(tensor1(&[0.0, 0.0])).unwrap();

    // Pre-activations 5 and 11, both positive: gate fully open.
    layer.forward(&tensor1(&[1.0, 2.0])).unwrap();

    let propagated = layer.backward(&tensor1(&[1.0, 1.0]), 0.1).unwrap();

    // propagated[k] = sum_n delta_in[n] * w_old[n,k], read before any
    // update: [1+3, 2+4].
    assert!((propagated.get(&[0]).unwrap() - 4.0).abs() < 1e-12);
    assert!((propagated.get(&[1]).unwrap() - 6.0).abs() < 1e-12);

    // w -= lr * delta_in * input, b -= lr * delta_in.
    assert_eq!(layer.weights().data(), &[0.9, 1.8, 2.9, 3.8]);
    assert_eq!(layer.biases().data(), &[-0.1, -0.1]);
}

#[test]
fn gradients_do_not_mutate_parameters() {
    let mut layer = Dense::new(2, 2, Activation::Sigmoid).unwrap();
    layer
        .set_weights(tensor2(2, 2, &[0.1, 0.2, 0.3, 0.4]))
        .unwrap();
    layer.forward(&tensor1(&[1.0, -1.0])).unwrap();

    let before = layer.weights().clone();
    let (_, grads) = layer.gradients(&tensor1(&[0.5, -0.5])).unwrap();
    assert_eq!(layer.weights(), &before);
    assert_eq!(grads.weights.shape(), &[2, 2]);
    assert_eq!(grads.biases.shape(), &[2]);
}

#[test]
fn parameter_update_matches_finite_difference() {
    let weights = [0.1, -0.2, 0.3, -0.4, 0.5, 0.2];
    let biases = [0.05, -0.05];
    let input = tensor1(&[0.3, -0.2, 0.5]);
    let eps = 1e-6;
    let lr = 0.05;

    let build = |w: &[f64], b: &[f64]| {
        let mut layer = Dense::new(2, 3, Activation::Sigmoid).unwrap();
        layer.set_weights(tensor2(2, 3, w)).unwrap();
        layer.set_biases(tensor1(b)).unwrap();
        layer
    };
    let loss = |w: &[f64], b: &[f64]| {
        let mut layer = build(w, b);
        let out = layer.forward(&input).unwrap();
        out.data().iter().sum::<f64>()
    };

    // Analytic gradient recovered from one backward step with an
    // all-ones upstream gradient: grad = -(w_after - w_before) / lr.
    let mut layer = build(&weights, &biases);
    layer.forward(&input).unwrap();
    layer.backward(&tensor1(&[1.0, 1.0]), lr).unwrap();

    for i in 0..weights.len() {
        let mut plus = weights;
        plus[i] += eps;
        let mut minus = weights;
        minus[i] -= eps;
        let numeric = (loss(&plus, &biases) - loss(&minus, &biases)) / (2.0 * eps);
        let analytic = -(layer.weights().data()[i] - weights[i]) / lr;
        assert!(
            (numeric - analytic).abs() < 1e-4,
            "weight {i}: numeric {numeric} vs analytic {analytic}"
        );
    }

    for i in 0..biases.len() {
        let mut plus = biases;
        plus[i] += eps;
        let mut minus = biases;
        minus[i] -= eps;
        let numeric = (loss(&weights, &plus) - loss(&weights, &minus)) / (2.0 * eps);
        let analytic = -(layer.biases().data()[i] - biases[i]) / lr;
        assert!(
            (numeric - analytic).abs() < 1e-4,
            "bias {i}: numeric {numeric} vs analytic {analytic}"
        );
    }
}

#[test]
fn setters_validate_shapes() {
    let mut layer = Dense::new(2, 3, Activation::Relu).unwrap();
    assert!(layer.set_weights(tensor2(3, 2, &[0.0; 6])).is_err());
    assert!(layer.set_biases(tensor1(&[0.0, 0.0, 0.0])).is_err());
}

#[test]
fn construction_rejects_zero_sizes() {
    assert!(Dense::new(0, 3, Activation::Relu).is_err());
    assert!(Dense::new(3, 0, Activation::Relu).is_err());
}
