use std::{fmt, io};

use machine_learning::MlErr;

/// All errors that can occur while configuring, building or running a matching model.
#[derive(Debug)]
pub enum ModelErr {
    /// A parameter name that isn't part of the model's table.
    UnknownParam(String),
    /// A value of the wrong kind or outside the parameter's domain.
    InvalidValue { param: String, reason: String },
    /// A required parameter is still unset at build time.
    MissingParam(&'static str),
    /// A per-block sequence has fewer entries than `num_blocks`.
    BlockIndex {
        param: &'static str,
        index: usize,
        len: usize,
    },
    NotBuilt,
    NotFitted,
    Ml(MlErr),
    Io(io::Error),
    Json(serde_json::Error),
}

impl ModelErr {
    pub(crate) fn invalid(param: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            param: param.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ModelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParam(name) => write!(f, "unknown parameter `{name}`"),
            Self::InvalidValue { param, reason } => {
                write!(f, "invalid value for `{param}`: {reason}")
            }
            Self::MissingParam(name) => write!(f, "parameter `{name}` is not set"),
            Self::BlockIndex { param, index, len } => write!(
                f,
                "block {index} is out of range for `{param}`, which has {len} entries"
            ),
            Self::NotBuilt => write!(f, "the model has not been built"),
            Self::NotFitted => write!(f, "the preprocessor has not been fitted"),
            Self::Ml(e) => write!(f, "layer library error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for ModelErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for ModelErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<io::Error> for ModelErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ModelErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, ModelErr>;
