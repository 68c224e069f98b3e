use ndarray::{ArrayD, ArrayViewD};

use super::Padding;
use crate::{
    MlErr, Result,
    arch::{Mode, Shape, activations::Activation},
    initialization::Initializer,
};

/// Every layer a graph can be wired with.
#[derive(Debug, Clone)]
pub enum Layer {
    Embedding(super::Embedding),
    Conv1d(super::Conv1d),
    MaxPool1d(super::MaxPool1d),
    Concatenate(super::Concatenate),
    Flatten(super::Flatten),
    Dropout(super::Dropout),
    Dense(super::Dense),
}
use Layer::*;

impl Layer {
    pub fn embedding(input_dim: usize, output_dim: usize, trainable: bool) -> Self {
        Self::Embedding(super::Embedding::new(input_dim, output_dim).with_trainable(trainable))
    }

    pub fn conv1d(
        filters: usize,
        kernel_size: usize,
        padding: Padding,
        act_fn: Activation,
    ) -> Self {
        Self::Conv1d(super::Conv1d::new(filters, kernel_size, padding, act_fn))
    }

    pub fn max_pool1d(pool_size: usize) -> Self {
        Self::MaxPool1d(super::MaxPool1d::new(pool_size))
    }

    pub fn concatenate(axis: usize) -> Self {
        Self::Concatenate(super::Concatenate::new(axis))
    }

    pub fn flatten() -> Self {
        Self::Flatten(super::Flatten)
    }

    pub fn dropout(rate: f32) -> Result<Self> {
        Ok(Self::Dropout(super::Dropout::new(rate)?))
    }

    pub fn dense(units: usize, act_fn: Activation) -> Self {
        Self::Dense(super::Dense::new(units, act_fn))
    }

    /// The type name shown in graph summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Embedding(_) => "Embedding",
            Conv1d(_) => "Conv1D",
            MaxPool1d(_) => "MaxPooling1D",
            Concatenate(_) => "Concatenate",
            Flatten(_) => "Flatten",
            Dropout(_) => "Dropout",
            Dense(_) => "Dense",
        }
    }

    /// Whether a trainer may update this layer's parameters.
    pub fn trainable(&self) -> bool {
        match self {
            Embedding(l) => l.trainable(),
            _ => true,
        }
    }

    /// Infers the per-example output shape for the given input shapes.
    pub fn output_shape(&self, inputs: &[&Shape]) -> Result<Shape> {
        match self {
            Embedding(l) => l.output_shape(single(self, inputs)?),
            Conv1d(l) => l.output_shape(single(self, inputs)?),
            MaxPool1d(l) => l.output_shape(single(self, inputs)?),
            Concatenate(l) => l.output_shape(inputs),
            Flatten(l) => Ok(l.output_shape(single(self, inputs)?)),
            Dropout(_) => Ok(single(self, inputs)?.clone()),
            Dense(l) => l.output_shape(single(self, inputs)?),
        }
    }

    /// The shapes of the parameter tensors this layer needs for the given inputs, in the order
    /// they're laid out in its parameter slice.
    pub fn param_shapes(&self, inputs: &[&Shape]) -> Result<Vec<Vec<usize>>> {
        match self {
            Embedding(l) => Ok(l.param_shapes()),
            Conv1d(l) => l.param_shapes(single(self, inputs)?),
            Dense(l) => l.param_shapes(single(self, inputs)?),
            MaxPool1d(_) | Concatenate(_) | Flatten(_) | Dropout(_) => Ok(vec![]),
        }
    }

    /// One initializer per parameter tensor.
    pub fn initializers(&self) -> Vec<Initializer> {
        match self {
            Embedding(l) => l.initializers(),
            Conv1d(l) => l.initializers(),
            Dense(l) => l.initializers(),
            MaxPool1d(_) | Concatenate(_) | Flatten(_) | Dropout(_) => vec![],
        }
    }

    /// Computes the layer's output for a batch.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the graph parameters.
    /// * `inputs` - One batched tensor per input node.
    /// * `mode` - Whether the pass is a training or an inference one.
    pub fn forward(
        &self,
        params: &[f32],
        inputs: &[ArrayViewD<f32>],
        mode: &mut Mode<'_>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Concatenate(l) => l.forward(inputs),
            Embedding(l) => l.forward(params, one(self, inputs)?),
            Conv1d(l) => l.forward(params, one(self, inputs)?),
            MaxPool1d(l) => l.forward(one(self, inputs)?),
            Flatten(l) => l.forward(one(self, inputs)?),
            Dropout(l) => Ok(l.forward(one(self, inputs)?, mode)),
            Dense(l) => l.forward(params, one(self, inputs)?),
        }
    }
}

fn single<'a>(layer: &Layer, inputs: &[&'a Shape]) -> Result<&'a Shape> {
    match inputs {
        [shape] => Ok(*shape),
        _ => Err(MlErr::ArityMismatch {
            layer: layer.kind(),
            got: inputs.len(),
            expected: 1,
        }),
    }
}

fn one<'v>(layer: &Layer, inputs: &'v [ArrayViewD<f32>]) -> Result<ArrayViewD<'v, f32>> {
    match inputs {
        [x] => Ok(x.view()),
        _ => Err(MlErr::ArityMismatch {
            layer: layer.kind(),
            got: inputs.len(),
            expected: 1,
        }),
    }
}
