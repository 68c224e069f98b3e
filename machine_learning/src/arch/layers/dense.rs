use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, Ix2, linalg};

use crate::{
    MlErr, Result,
    arch::{Shape, activations::Activation},
    initialization::Initializer,
};

/// A fully connected layer over flat examples.
#[derive(Debug, Clone)]
pub struct Dense {
    units: usize,
    act_fn: Activation,
    kernel_init: Initializer,
    bias_init: Initializer,
}

impl Dense {
    pub fn new(units: usize, act_fn: Activation) -> Self {
        Self {
            units,
            act_fn,
            kernel_init: Initializer::GlorotUniform,
            bias_init: Initializer::Zeros,
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn act_fn(&self) -> Activation {
        self.act_fn
    }

    pub fn output_shape(&self, input: &Shape) -> Result<Shape> {
        self.input_dim(input)?;
        Ok(Shape::from([self.units]))
    }

    pub fn param_shapes(&self, input: &Shape) -> Result<Vec<Vec<usize>>> {
        let n = self.input_dim(input)?;
        Ok(vec![vec![n, self.units], vec![self.units]])
    }

    pub fn initializers(&self) -> Vec<Initializer> {
        vec![self.kernel_init, self.bias_init]
    }

    pub fn forward(&self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix2>()?;
        let (w, b) = self.view_params(params, x.ncols())?;

        let mut z = Array2::zeros((x.nrows(), self.units));
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut z);
        z += &b;

        self.act_fn.apply(&mut z);
        Ok(z.into_dyn())
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
        n: usize,
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = n * self.units;
        if params.len() != w_size + self.units {
            return Err(MlErr::SizeMismatch {
                what: "dense parameters",
                got: params.len(),
                expected: w_size + self.units,
            });
        }

        let weights = ArrayView2::from_shape((n, self.units), &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.units, &params[w_size..])?;
        Ok((weights, biases))
    }

    fn input_dim(&self, input: &Shape) -> Result<usize> {
        match *input.dims() {
            [n] => Ok(n),
            _ => Err(MlErr::InvalidShape {
                layer: "dense",
                shape: input.clone(),
                reason: "expected a flat input, flatten it first".into(),
            }),
        }
    }
}
