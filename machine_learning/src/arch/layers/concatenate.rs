use ndarray::{ArrayD, ArrayViewD, Axis};

use crate::{MlErr, Result, arch::Shape};

/// Joins its inputs along `axis`, counted with the batch as axis 0 (so `axis = 1` is the
/// sequence axis of a `(batch, len, channels)` tensor).
#[derive(Debug, Clone)]
pub struct Concatenate {
    axis: usize,
}

impl Concatenate {
    pub fn new(axis: usize) -> Self {
        Self { axis }
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn output_shape(&self, inputs: &[&Shape]) -> Result<Shape> {
        let Some((first, rest)) = inputs.split_first() else {
            return Err(MlErr::ArityMismatch {
                layer: "concatenate",
                got: 0,
                expected: 2,
            });
        };

        let axis = self.example_axis(first)?;
        let mut dims = first.dims().to_vec();

        for shape in rest {
            let compatible = shape.rank() == first.rank()
                && shape
                    .dims()
                    .iter()
                    .zip(first.dims())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);

            if !compatible {
                return Err(MlErr::InvalidShape {
                    layer: "concatenate",
                    shape: (*shape).clone(),
                    reason: format!(
                        "can't be joined with {first} along axis {}",
                        self.axis
                    ),
                });
            }

            dims[axis] += shape.dims()[axis];
        }

        Ok(Shape::new(dims))
    }

    pub fn forward(&self, inputs: &[ArrayViewD<f32>]) -> Result<ArrayD<f32>> {
        Ok(ndarray::concatenate(Axis(self.axis), inputs)?)
    }

    /// Maps the layer's axis onto the per-example dims.
    fn example_axis(&self, shape: &Shape) -> Result<usize> {
        match self.axis.checked_sub(1) {
            Some(axis) if axis < shape.rank() => Ok(axis),
            _ => Err(MlErr::InvalidShape {
                layer: "concatenate",
                shape: shape.clone(),
                reason: format!("axis {} is out of range", self.axis),
            }),
        }
    }
}
