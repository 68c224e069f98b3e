mod naive;

pub use naive::{NaivePreprocessor, OOV, PAD};

use ndarray::Array2;

use crate::Result;

/// Statistics a fitted preprocessor knows about its data, used to fill unset model parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub vocab_size: Option<usize>,
    pub input_length: Option<usize>,
}

/// Turns raw text into the token ids a matching model consumes.
pub trait Preprocessor {
    /// Learns the vocabulary of `texts`.
    fn fit(&mut self, texts: &[&str]);

    /// Maps `text` to its fixed length sequence of token ids.
    fn transform(&self, text: &str) -> Result<Vec<usize>>;

    /// Maps every text to a row of a `(texts.len(), length)` batch, ids stored as floats the way
    /// an embedding layer takes them.
    fn transform_batch(&self, texts: &[&str]) -> Result<Array2<f32>> {
        let rows = texts
            .iter()
            .map(|text| self.transform(text))
            .collect::<Result<Vec<_>>>()?;

        let length = rows.first().map_or(0, Vec::len);
        let ids = rows.into_iter().flatten().map(|id| id as f32).collect();

        let batch = Array2::from_shape_vec((texts.len(), length), ids)
            .map_err(machine_learning::MlErr::from)?;

        Ok(batch)
    }

    fn context(&self) -> Context;
}
