use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

use crate::{arch::Shape, initialization::RandErr};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ArityMismatch {
        layer: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidShape {
        layer: &'static str,
        shape: Shape,
        reason: String,
    },
    InputShapeMismatch {
        input: String,
        got: Vec<usize>,
        expected: Shape,
    },
    ParamShapeMismatch {
        layer: String,
    },
    TokenOutOfRange {
        token: f32,
        input_dim: usize,
    },
    InvalidRate(f32),
    UnknownActivation(String),
    UnknownPadding(String),
    UnknownNode(usize),
    UnknownLayer(usize),
    NotAnInput(String),
    Init(RandErr),
    Shape(ShapeError),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::ArityMismatch {
                layer,
                got,
                expected,
            } => write!(f, "{layer} expects {expected} input(s), got {got}"),
            MlErr::InvalidShape {
                layer,
                shape,
                reason,
            } => write!(f, "{layer} can't take an input of shape {shape}: {reason}"),
            MlErr::InputShapeMismatch {
                input,
                got,
                expected,
            } => write!(
                f,
                "input {input} has shape {got:?}, expected a batch of {expected}"
            ),
            MlErr::ParamShapeMismatch { layer } => write!(
                f,
                "layer {layer} was applied to inputs incompatible with its existing weights"
            ),
            MlErr::TokenOutOfRange { token, input_dim } => write!(
                f,
                "token {token} is not a valid index for an embedding of {input_dim} rows"
            ),
            MlErr::InvalidRate(rate) => {
                write!(f, "dropout rate must be in [0, 1), got {rate}")
            }
            MlErr::UnknownActivation(name) => write!(f, "unknown activation function: {name}"),
            MlErr::UnknownPadding(name) => write!(f, "unknown padding mode: {name}"),
            MlErr::UnknownNode(id) => write!(f, "node {id} does not belong to this graph"),
            MlErr::UnknownLayer(id) => write!(f, "layer {id} does not belong to this graph"),
            MlErr::NotAnInput(name) => write!(f, "node {name} is not an input placeholder"),
            MlErr::Init(e) => write!(f, "failed to initialize parameters: {e}"),
            MlErr::Shape(e) => write!(f, "{e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Init(e) => Some(e),
            MlErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RandErr> for MlErr {
    fn from(value: RandErr) -> Self {
        Self::Init(value)
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}
