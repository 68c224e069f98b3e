mod concatenate;
mod conv1d;
mod dense;
mod dropout;
mod embedding;
mod flatten;
mod layer;
mod max_pool1d;
mod padding;

pub use concatenate::Concatenate;
pub use conv1d::Conv1d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use flatten::Flatten;
pub use layer::Layer;
pub use max_pool1d::MaxPool1d;
pub use padding::Padding;
