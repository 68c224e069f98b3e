use ndarray::{ArrayD, ArrayViewD};

use crate::{Result, arch::Shape};

/// Collapses every per-example dim into one.
#[derive(Debug, Clone, Default)]
pub struct Flatten;

impl Flatten {
    pub fn output_shape(&self, input: &Shape) -> Shape {
        Shape::from([input.size()])
    }

    pub fn forward(&self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let batch = x.shape().first().copied().unwrap_or(0);
        let size: usize = x.shape().iter().skip(1).product();

        Ok(x.to_shape((batch, size))?.into_owned().into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    #[test]
    fn flattens_row_major() {
        let x =
            Array3::from_shape_fn((2, 3, 2), |(b, t, c)| (b * 100 + t * 10 + c) as f32).into_dyn();
        let out = Flatten.forward(x.view()).unwrap();

        assert_eq!(out.shape(), &[2, 6]);
        assert_eq!(out[[1, 3]], 111.);
        assert_eq!(Flatten.output_shape(&Shape::from([22, 32])), Shape::from([704]));
    }
}
