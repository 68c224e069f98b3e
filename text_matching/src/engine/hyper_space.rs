use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use super::ParamValue;

const TOLERANCE: f64 = 1e-9;

/// The candidate values a tuner may assign to a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperSpace {
    /// A discrete set of candidates.
    Choice(Vec<ParamValue>),
    /// `round(uniform(low, high) / q) * q`, kept inside `[low, high]`.
    QUniform { low: f64, high: f64, q: f64 },
    Uniform { low: f64, high: f64 },
}

impl HyperSpace {
    pub fn choice<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        HyperSpace::Choice(values.into_iter().map(Into::into).collect())
    }

    /// Whether `value` is one of the candidates of this space.
    pub fn contains(&self, value: &ParamValue) -> bool {
        match self {
            HyperSpace::Choice(values) => values.contains(value),
            HyperSpace::QUniform { low, high, q } => value.as_f64().is_some_and(|x| {
                let off_grid = ((x / q).round() * q - x).abs();
                in_range(x, *low, *high) && off_grid <= TOLERANCE.max(q * 1e-6)
            }),
            HyperSpace::Uniform { low, high } => {
                value.as_f64().is_some_and(|x| in_range(x, *low, *high))
            }
        }
    }

    /// Draws a candidate.
    ///
    /// # Returns
    /// `None` if the space is empty: no choices, `low > high` or a non positive `q`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<ParamValue> {
        match self {
            HyperSpace::Choice(values) => values.choose(rng).cloned(),
            HyperSpace::QUniform { low, high, q } => {
                if low > high || *q <= 0.0 {
                    return None;
                }

                let x = rng.random_range(*low..=*high);
                let snapped = ((x / q).round() * q).clamp(*low, *high);
                Some(ParamValue::Float(snapped))
            }
            HyperSpace::Uniform { low, high } => {
                (low <= high).then(|| ParamValue::Float(rng.random_range(*low..=*high)))
            }
        }
    }
}

fn in_range(x: f64, low: f64, high: f64) -> bool {
    x >= low - TOLERANCE && x <= high + TOLERANCE
}
