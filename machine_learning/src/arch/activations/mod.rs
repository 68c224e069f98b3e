mod activation;
mod softmax;

pub use activation::Activation;
