pub mod engine;
pub mod error;
pub mod models;
pub mod preprocessors;

pub use error::{ModelErr, Result};
