use ndarray::{ArrayD, ArrayView2, ArrayViewD, Ix2, s};

use crate::{
    MlErr, Result,
    arch::Shape,
    initialization::Initializer,
};

/// A lookup table mapping token indices to dense vectors.
///
/// Input: `(len,)` token indices stored as floats. Output: `(len, output_dim)`.
#[derive(Debug, Clone)]
pub struct Embedding {
    input_dim: usize,
    output_dim: usize,
    trainable: bool,
    init: Initializer,
}

impl Embedding {
    /// Creates a new `Embedding`.
    ///
    /// # Arguments
    /// * `input_dim` - The amount of rows in the table (the vocabulary size).
    /// * `output_dim` - The dimension of each embedded vector.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            trainable: true,
            init: Initializer::Uniform {
                low: -0.05,
                high: 0.05,
            },
        }
    }

    /// Marks the table as frozen (or not) for whatever trains the graph.
    pub fn with_trainable(mut self, trainable: bool) -> Self {
        self.trainable = trainable;
        self
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn trainable(&self) -> bool {
        self.trainable
    }

    pub fn output_shape(&self, input: &Shape) -> Result<Shape> {
        let &[len] = input.dims() else {
            return Err(MlErr::InvalidShape {
                layer: "embedding",
                shape: input.clone(),
                reason: "expected a sequence of token indices".into(),
            });
        };

        Ok(Shape::from([len, self.output_dim]))
    }

    pub fn param_shapes(&self) -> Vec<Vec<usize>> {
        vec![vec![self.input_dim, self.output_dim]]
    }

    pub fn initializers(&self) -> Vec<Initializer> {
        vec![self.init]
    }

    pub fn forward(&self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let table = ArrayView2::from_shape((self.input_dim, self.output_dim), params)?;
        let x = x.into_dimensionality::<Ix2>()?;
        let (batch, len) = x.dim();

        let mut out = ndarray::Array3::zeros((batch, len, self.output_dim));
        for ((b, t), &token) in x.indexed_iter() {
            let row = self.row(token)?;
            out.slice_mut(s![b, t, ..]).assign(&table.row(row));
        }

        Ok(out.into_dyn())
    }

    fn row(&self, token: f32) -> Result<usize> {
        let valid = token.is_finite() && token >= 0. && token.fract() == 0.;
        let row = token as usize;

        if !valid || row >= self.input_dim {
            return Err(MlErr::TokenOutOfRange {
                token,
                input_dim: self.input_dim,
            });
        }

        Ok(row)
    }
}
