use ndarray::{Array2, Array3, ArrayD, ArrayView1, ArrayView2, ArrayViewD, Axis, Ix3, linalg, s};
use rayon::prelude::*;

use super::Padding;
use crate::{
    MlErr, Result,
    arch::{Shape, activations::Activation},
    initialization::Initializer,
};

/// A 1-D convolution over the sequence axis.
///
/// Input: `(len, channels)`. Output: `(out_len, filters)` where `out_len` depends on `padding`.
/// Parameters: a `(kernel_size, channels, filters)` kernel followed by a `(filters,)` bias.
#[derive(Debug, Clone)]
pub struct Conv1d {
    filters: usize,
    kernel_size: usize,
    padding: Padding,
    act_fn: Activation,
    kernel_init: Initializer,
    bias_init: Initializer,
}

impl Conv1d {
    pub fn new(filters: usize, kernel_size: usize, padding: Padding, act_fn: Activation) -> Self {
        Self {
            filters,
            kernel_size,
            padding,
            act_fn,
            kernel_init: Initializer::GlorotUniform,
            bias_init: Initializer::Zeros,
        }
    }

    pub fn filters(&self) -> usize {
        self.filters
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn output_shape(&self, input: &Shape) -> Result<Shape> {
        let (len, _) = self.dims(input)?;
        let out_len = self
            .padding
            .output_len(len, self.kernel_size)
            .ok_or_else(|| MlErr::InvalidShape {
                layer: "conv1d",
                shape: input.clone(),
                reason: format!(
                    "a kernel of size {} doesn't fit with {} padding",
                    self.kernel_size, self.padding
                ),
            })?;

        Ok(Shape::from([out_len, self.filters]))
    }

    pub fn param_shapes(&self, input: &Shape) -> Result<Vec<Vec<usize>>> {
        let (_, channels) = self.dims(input)?;
        Ok(vec![
            vec![self.kernel_size, channels, self.filters],
            vec![self.filters],
        ])
    }

    pub fn initializers(&self) -> Vec<Initializer> {
        vec![self.kernel_init, self.bias_init]
    }

    /// Convolves every example of the batch in parallel.
    pub fn forward(&self, params: &[f32], x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix3>()?;
        let (batch, len, channels) = x.dim();
        let out_len = self
            .padding
            .output_len(len, self.kernel_size)
            .ok_or_else(|| MlErr::InvalidShape {
                layer: "conv1d",
                shape: Shape::from([len, channels]),
                reason: "kernel doesn't fit".into(),
            })?;

        let (w, b) = self.view_params(params, channels)?;

        let outputs: Vec<Array2<f32>> = (0..batch)
            .into_par_iter()
            .map(|i| self.convolve(x.index_axis(Axis(0), i), w, b, out_len))
            .collect();

        let mut out = Array3::zeros((batch, out_len, self.filters));
        for (mut slot, example) in out.outer_iter_mut().zip(&outputs) {
            slot.assign(example);
        }

        self.act_fn.apply(&mut out);
        Ok(out.into_dyn())
    }

    /// Convolves a single `(len, channels)` example by unrolling its windows into a
    /// `(out_len, kernel_size * channels)` matrix and multiplying it by the kernel.
    fn convolve(
        &self,
        x: ArrayView2<f32>,
        w: ArrayView2<f32>,
        b: ArrayView1<f32>,
        out_len: usize,
    ) -> Array2<f32> {
        let (len, channels) = x.dim();
        let (left, _) = self.padding.pads(self.kernel_size);

        let mut windows = Array2::zeros((out_len, self.kernel_size * channels));
        for (t, mut window) in windows.outer_iter_mut().enumerate() {
            for k in 0..self.kernel_size {
                let Some(pos) = (t + k).checked_sub(left).filter(|&pos| pos < len) else {
                    continue;
                };

                window
                    .slice_mut(s![k * channels..(k + 1) * channels])
                    .assign(&x.row(pos));
            }
        }

        let mut out = Array2::zeros((out_len, self.filters));
        linalg::general_mat_mul(1.0, &windows, &w, 0.0, &mut out);
        out += &b;
        out
    }

    /// Gives a view of the raw parameter slice as the unrolled kernel and the bias.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
        channels: usize,
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = self.kernel_size * channels * self.filters;
        if params.len() != w_size + self.filters {
            return Err(MlErr::SizeMismatch {
                what: "conv1d parameters",
                got: params.len(),
                expected: w_size + self.filters,
            });
        }

        let (w_raw, b_raw) = params.split_at(w_size);
        let w = ArrayView2::from_shape((self.kernel_size * channels, self.filters), w_raw)?;
        let b = ArrayView1::from_shape(self.filters, b_raw)?;
        Ok((w, b))
    }

    fn dims(&self, input: &Shape) -> Result<(usize, usize)> {
        match *input.dims() {
            [len, channels] => Ok((len, channels)),
            _ => Err(MlErr::InvalidShape {
                layer: "conv1d",
                shape: input.clone(),
                reason: "expected (len, channels)".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, array};

    use super::*;

    /// A single channel, single filter kernel of ones plus a bias, i.e. a moving sum.
    fn moving_sum(kernel_size: usize, padding: Padding, bias: f32) -> (Conv1d, Vec<f32>) {
        let conv = Conv1d::new(1, kernel_size, padding, Activation::Linear);
        let mut params = vec![1.; kernel_size];
        params.push(bias);
        (conv, params)
    }

    fn sequence() -> ArrayD<f32> {
        // batch of 1, len 4, 1 channel: [1, 2, 3, 4]
        Array::from_shape_vec((1, 4, 1), vec![1., 2., 3., 4.])
            .unwrap()
            .into_dyn()
    }

    fn values(out: ArrayD<f32>) -> Vec<f32> {
        out.iter().copied().collect()
    }

    #[test]
    fn same_padding_keeps_length() {
        let (conv, params) = moving_sum(3, Padding::Same, 0.);
        let out = conv.forward(&params, sequence().view()).unwrap();

        assert_eq!(out.shape(), &[1, 4, 1]);
        assert_eq!(values(out), [3., 6., 9., 7.]);
    }

    #[test]
    fn valid_padding_shrinks() {
        let (conv, params) = moving_sum(3, Padding::Valid, 1.);
        let out = conv.forward(&params, sequence().view()).unwrap();

        assert_eq!(out.shape(), &[1, 2, 1]);
        assert_eq!(values(out), [7., 10.]);
    }

    #[test]
    fn causal_padding_looks_back_only() {
        let (conv, params) = moving_sum(2, Padding::Causal, 0.);
        let out = conv.forward(&params, sequence().view()).unwrap();

        assert_eq!(values(out), [1., 3., 5., 7.]);
    }

    #[test]
    fn mixes_channels_into_filters() {
        // kernel_size 1, 2 channels, 2 filters: filter 0 adds the channels, filter 1 subtracts them
        let conv = Conv1d::new(2, 1, Padding::Valid, Activation::Relu);
        let params = [1., 1., 1., -1., 0., 0.];
        let x = array![[[3., 1.], [1., 3.]]].into_dyn();

        let out = conv.forward(&params, x.view()).unwrap();
        assert_eq!(values(out), [4., 2., 4., 0.]);
    }

    #[test]
    fn shapes() {
        let conv = Conv1d::new(32, 3, Padding::Valid, Activation::Relu);
        let input = Shape::from([10, 8]);

        assert_eq!(conv.output_shape(&input).unwrap(), Shape::from([8, 32]));
        assert_eq!(
            conv.param_shapes(&input).unwrap(),
            vec![vec![3, 8, 32], vec![32]]
        );
        assert!(conv.output_shape(&Shape::from([2, 8])).is_err());
        assert!(conv.output_shape(&Shape::from([10])).is_err());
    }

    #[test]
    fn rejects_wrong_parameter_count() {
        let conv = Conv1d::new(1, 3, Padding::Same, Activation::Linear);
        let err = conv.forward(&[1., 1.], sequence().view()).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { expected: 4, .. }));
    }
}
