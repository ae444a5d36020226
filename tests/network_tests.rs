use lamina::engine::activation::Activation;
use lamina::engine::layer::Dense;
use lamina::engine::network::Network;
use lamina::engine::tensor::Tensor;

fn tensor1(vals: &[f64]) -> Tensor {
    Tensor::with_data(&[vals.len()], vals.to_vec()).unwrap()
}

fn mse(prediction: &Tensor, target: &Tensor) -> f64 {
    prediction
        .data()
        .iter()
        .zip(target.data())
        .map(|(p, t)| (p - t) * (p - t))
        .sum::<f64>()
        / prediction.len() as f64
}

#[test]
fn empty_network_is_identity() {
    let mut net = Network::new(0.1);
    assert!(net.is_empty());

    let input = tensor1(&[1.0, -2.0, 3.0]);
    let out = net.forward(&input).unwrap();
    assert_eq!(out, input);

    let back = net.backward(&input).unwrap();
    assert_eq!(back, input);
}

#[test]
fn forward_chains_layer_outputs() {
    let mut net = Network::new(0.1);
    net.add(Dense::new(4, 2, Activation::Sigmoid).unwrap());
    net.add(Dense::new(3, 4, Activation::Sigmoid).unwrap());
    assert_eq!(net.len(), 2);

    let out = net.forward(&tensor1(&[0.5, -0.5])).unwrap();
    assert_eq!(out.shape(), &[3]);
    // Sigmoid keeps every element in (0, 1).
    assert!(out.data().iter().all(|&v| v > 0.0 && v < 1.0));
}

#[test]
fn backward_returns_input_shaped_gradient() {
    let mut net = Network::new(0.1);
    net.add(Dense::new(4, 3, Activation::Tanh).unwrap());
    net.add(Dense::new(2, 4, Activation::Sigmoid).unwrap());

    net.forward(&tensor1(&[0.1, 0.2, 0.3])).unwrap();
    let back = net.backward(&tensor1(&[1.0, -1.0])).unwrap();
    assert_eq!(back.shape(), &[3]);
}

#[test]
fn xor_loss_decreases_with_training() {
    let samples = [
        ([0.0, 0.0], [0.0]),
        ([0.0, 1.0], [1.0]),
        ([1.0, 0.0], [1.0]),
        ([1.0, 1.0], [0.0]),
    ];

    let mut net = Network::new(0.5);
    net.add(Dense::new(4, 2, Activation::Sigmoid).unwrap());
    net.add(Dense::new(1, 4, Activation::Sigmoid).unwrap());

    let epoch_loss = |net: &mut Network| -> f64 {
        samples
            .iter()
            .map(|(x, y)| {
                let out = net.forward(&tensor1(x)).unwrap();
                mse(&out, &tensor1(y))
            })
            .sum::<f64>()
            / samples.len() as f64
    };

    let before = epoch_loss(&mut net);
    for _ in 0..5000 {
        for (x, y) in &samples {
            let out = net.forward(&tensor1(x)).unwrap();
            let gradient = out.subtract(&tensor1(y)).unwrap();
            net.backward(&gradient).unwrap();
        }
    }
    let after = epoch_loss(&mut net);

    assert!(
        after < before,
        "loss should fall during training: {before} -> {after}"
    );
    assert!(after < 0.2, "trained loss still high: {after}");
}

#[test]
fn verbose_flag_does_not_change_results() {
    let mut quiet = Network::new(0.1);
    let mut chatty = Network::new(0.1).with_verbose(true);
    let layer = Dense::new(2, 2, Activation::Tanh).unwrap();
    quiet.add(layer.clone());
    chatty.add(layer);

    let input = tensor1(&[0.3, -0.7]);
    let a = quiet.forward(&input).unwrap();
    let b = chatty.forward(&input).unwrap();
    assert_eq!(a, b);
}
