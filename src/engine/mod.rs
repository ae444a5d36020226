pub mod activation;
pub mod error;
pub mod layer;
pub mod network;
pub mod tensor;
