use std::env;
use std::process;

use lamina::data::csv::CsvDataset;
use lamina::data::dataset::Dataset;
use lamina::engine::activation::Activation;
use lamina::engine::layer::{Conv, Dense, Flatten, MaxPool};
use lamina::engine::network::Network;
use lamina::engine::tensor::Tensor;

// Small CNN over an MNIST-style CSV: label,p0,...,p783 per line.
fn main() {
    env_logger::init();

    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: mnist_cnn <train.csv>");
            process::exit(1);
        }
    };

    let dataset = match CsvDataset::from_path(&path, 28, 28, 10) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("failed to load {path}: {e}");
            process::exit(1);
        }
    };
    println!("loaded {} samples", dataset.len());

    // 1x28x28 -> conv 8x26x26 -> pool 8x13x13 -> flatten 1352 -> dense 10
    let mut network = Network::new(0.01);
    network.add(Conv::new(8, 1, 3, 3).unwrap());
    network.add(MaxPool::new(2, 2).unwrap());
    network.add(Flatten::new());
    network.add(Dense::new(10, 8 * 13 * 13, Activation::Sigmoid).unwrap());

    for epoch in 0..3 {
        let mut loss = 0.0;
        let mut correct = 0;
        for i in 0..dataset.len() {
            let sample = dataset.get(i);

            let output = network.forward(&sample.input).unwrap();
            let gradient = output.subtract(&sample.label).unwrap();
            loss += gradient.data().iter().map(|d| d * d).sum::<f64>();

            if argmax(output.data()) == argmax(sample.label.data()) {
                correct += 1;
            }

            network.backward(&gradient).unwrap();

            if (i + 1) % 1000 == 0 {
                println!(
                    "epoch {epoch}, sample {}/{}: loss {:.4}, accuracy {:.2}%",
                    i + 1,
                    dataset.len(),
                    loss / (i + 1) as f64,
                    100.0 * correct as f64 / (i + 1) as f64
                );
            }
        }
        println!(
            "epoch {epoch} done: loss {:.4}, accuracy {:.2}%",
            loss / dataset.len() as f64,
            100.0 * correct as f64 / dataset.len() as f64
        );
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
