use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::HyperSpace;
use crate::{ModelErr, Result};

/// A loosely typed parameter value, the currency of name-indexed access to a parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<i64>),
}

impl ParamValue {
    /// The value as a float, integers included.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Int(n) => Some(n as f64),
            ParamValue::Float(x) => Some(x),
            _ => None,
        }
    }

    pub(crate) fn into_positive(self, param: &str) -> Result<usize> {
        match self {
            ParamValue::Int(n) => positive(param, n),
            other => Err(ModelErr::invalid(param, format!("expected an integer, got {other}"))),
        }
    }

    pub(crate) fn into_positive_list(self, param: &str) -> Result<Vec<usize>> {
        match self {
            ParamValue::List(values) => values.into_iter().map(|n| positive(param, n)).collect(),
            other => Err(ModelErr::invalid(param, format!("expected a list, got {other}"))),
        }
    }

    pub(crate) fn into_bool(self, param: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(b) => Ok(b),
            other => Err(ModelErr::invalid(param, format!("expected a bool, got {other}"))),
        }
    }

    /// Converts the value to a rate in `[0, 1)`.
    pub(crate) fn into_rate(self, param: &str) -> Result<f32> {
        let rate = self
            .as_f64()
            .ok_or_else(|| ModelErr::invalid(param, format!("expected a number, got {self}")))?;

        if !(0.0..1.0).contains(&rate) {
            return Err(ModelErr::invalid(param, format!("{rate} is not in [0, 1)")));
        }

        Ok(rate as f32)
    }

    /// Parses a string value into `T`.
    pub(crate) fn parse<T>(self, param: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self {
            ParamValue::Str(s) => s
                .parse()
                .map_err(|e: T::Err| ModelErr::invalid(param, e.to_string())),
            other => Err(ModelErr::invalid(param, format!("expected a string, got {other}"))),
        }
    }
}

fn positive(param: &str, n: i64) -> Result<usize> {
    usize::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ModelErr::invalid(param, format!("{n} is not a positive integer")))
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(n) => write!(f, "{n}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Str(s) => write!(f, "{s:?}"),
            ParamValue::List(values) => write!(f, "{values:?}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<usize> for ParamValue {
    fn from(n: usize) -> Self {
        ParamValue::Int(n as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl From<f32> for ParamValue {
    fn from(x: f32) -> Self {
        ParamValue::Float(x as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(values: Vec<i64>) -> Self {
        ParamValue::List(values)
    }
}

impl From<&[usize]> for ParamValue {
    fn from(values: &[usize]) -> Self {
        ParamValue::List(values.iter().map(|&n| n as i64).collect())
    }
}

/// Search spaces keyed by the name of the parameter they describe.
pub type HyperSpaces = BTreeMap<&'static str, HyperSpace>;

/// Name-indexed access to a typed parameter table.
///
/// The set of names is fixed: `get` and `set` on a name outside of it fail with
/// `ModelErr::UnknownParam` and never add an entry.
pub trait ParamTable {
    /// Every parameter name, in declaration order.
    fn names(&self) -> &'static [&'static str];

    /// Returns the value of `name`, `None` if the parameter is still unset.
    fn get(&self, name: &str) -> Result<Option<ParamValue>>;

    /// Converts `value` to the parameter's type and stores it. On error the parameter keeps its
    /// previous value.
    fn set(&mut self, name: &str, value: ParamValue) -> Result<()>;

    /// The search spaces of the tunable parameters.
    fn hyper_spaces(&self) -> HyperSpaces;

    fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// The names of the parameters that are still unset.
    fn missing(&self) -> Vec<&'static str> {
        self.names()
            .iter()
            .copied()
            .filter(|name| matches!(self.get(name), Ok(None)))
            .collect()
    }

    fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}
