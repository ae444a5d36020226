use lamina::engine::activation::Activation;
use lamina::engine::layer::Dense;
use lamina::engine::network::Network;
use lamina::engine::tensor::Tensor;

// XOR with a 2-4-1 sigmoid network
fn main() {
    env_logger::init();

    let x_data = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ];
    let y_data = vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]];

    let mut network = Network::new(0.5);
    network.add(Dense::new(4, 2, Activation::Sigmoid).unwrap());
    network.add(Dense::new(1, 4, Activation::Sigmoid).unwrap());

    for epoch in 0..10000 {
        let mut loss = 0.0;
        for (x, y) in x_data.iter().zip(&y_data) {
            let input = Tensor::with_data(&[2], x.clone()).unwrap();
            let target = Tensor::with_data(&[1], y.clone()).unwrap();

            let output = network.forward(&input).unwrap();
            let gradient = output.subtract(&target).unwrap();
            loss += gradient.data().iter().map(|d| d * d).sum::<f64>();

            network.backward(&gradient).unwrap();
        }

        if epoch % 1000 == 0 {
            println!("Epoch: {}, Loss: {}", epoch, loss / x_data.len() as f64);
        }
    }

    for (x, y) in x_data.iter().zip(&y_data) {
        let input = Tensor::with_data(&[2], x.clone()).unwrap();
        let output = network.forward(&input).unwrap();
        println!(
            "{:?} -> {:.4} (expected {})",
            x,
            output.get(&[0]).unwrap(),
            y[0]
        );
    }
}
