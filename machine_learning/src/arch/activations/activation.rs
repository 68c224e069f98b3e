use std::{fmt, str::FromStr};

use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

use super::softmax::softmax_inplace;
use crate::MlErr;

/// The activation applied at the end of a `Conv1d` or `Dense` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softplus,
    Softmax,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Softplus => "softplus",
            Self::Softmax => "softmax",
        }
    }

    /// Applies the activation in place. Softmax is normalized over the last axis, every other
    /// activation is element-wise.
    pub fn apply<D: Dimension>(&self, x: &mut Array<f32, D>) {
        match self {
            Self::Linear => {}
            Self::Relu => x.mapv_inplace(|z| z.max(0.)),
            Self::Sigmoid => x.mapv_inplace(|z| 1. / (1. + (-z).exp())),
            Self::Tanh => x.mapv_inplace(f32::tanh),
            Self::Softplus => x.mapv_inplace(|z| z.max(0.) + (-z.abs()).exp().ln_1p()),
            Self::Softmax => softmax_inplace(x),
        }
    }
}

impl FromStr for Activation {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let act = match s {
            "linear" => Self::Linear,
            "relu" => Self::Relu,
            "sigmoid" => Self::Sigmoid,
            "tanh" => Self::Tanh,
            "softplus" => Self::Softplus,
            "softmax" => Self::Softmax,
            _ => return Err(MlErr::UnknownActivation(s.to_string())),
        };

        Ok(act)
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
