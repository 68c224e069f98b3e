use ndarray::{Array3, ArrayD, ArrayViewD, Axis, Ix3, s};

use crate::{MlErr, Result, arch::Shape};

/// Max-pooling over the sequence axis with a stride equal to the pool size and no padding.
#[derive(Debug, Clone)]
pub struct MaxPool1d {
    pool_size: usize,
}

impl MaxPool1d {
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn output_shape(&self, input: &Shape) -> Result<Shape> {
        let &[len, channels] = input.dims() else {
            return Err(MlErr::InvalidShape {
                layer: "max_pool1d",
                shape: input.clone(),
                reason: "expected (len, channels)".into(),
            });
        };

        let out_len = self.output_len(len).ok_or_else(|| MlErr::InvalidShape {
            layer: "max_pool1d",
            shape: input.clone(),
            reason: format!("sequence is shorter than the pool size {}", self.pool_size),
        })?;

        Ok(Shape::from([out_len, channels]))
    }

    pub fn forward(&self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix3>()?;
        let (batch, len, channels) = x.dim();
        let out_len = self.output_len(len).ok_or_else(|| MlErr::InvalidShape {
            layer: "max_pool1d",
            shape: Shape::from([len, channels]),
            reason: "sequence is shorter than the pool size".into(),
        })?;

        let p = self.pool_size;
        let mut out = Array3::zeros((batch, out_len, channels));
        for t in 0..out_len {
            let window = x.slice(s![.., t * p..(t + 1) * p, ..]);
            let max = window.fold_axis(Axis(1), f32::NEG_INFINITY, |&acc, &z| acc.max(z));
            out.slice_mut(s![.., t, ..]).assign(&max);
        }

        Ok(out.into_dyn())
    }

    fn output_len(&self, len: usize) -> Option<usize> {
        (self.pool_size > 0 && len >= self.pool_size)
            .then(|| (len - self.pool_size) / self.pool_size + 1)
    }
}
