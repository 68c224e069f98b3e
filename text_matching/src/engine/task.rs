use std::{fmt, str::FromStr};

use machine_learning::arch::{activations::Activation, layers::Layer};
use serde::{Deserialize, Serialize};

use crate::ModelErr;

/// What a matching model predicts, which decides its output layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// A single relevance score per pair.
    Ranking,
    /// A probability per class for each pair.
    Classification { num_classes: usize },
}

impl Task {
    /// The amount of values the model outputs per pair.
    pub fn output_dim(&self) -> usize {
        match self {
            Task::Ranking => 1,
            Task::Classification { num_classes } => *num_classes,
        }
    }

    pub fn output_activation(&self) -> Activation {
        match self {
            Task::Ranking => Activation::Linear,
            Task::Classification { .. } => Activation::Softmax,
        }
    }

    /// The layer producing the model's output.
    pub fn output_layer(&self) -> Layer {
        Layer::dense(self.output_dim(), self.output_activation())
    }
}

/// Parses `ranking`, `classification` (two classes) or `classification:<num_classes>`.
impl FromStr for Task {
    type Err = ModelErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelErr::invalid("task", format!("unknown task `{s}`"));

        match s.split_once(':') {
            None if s == "ranking" => Ok(Task::Ranking),
            None if s == "classification" => Ok(Task::Classification { num_classes: 2 }),
            Some(("classification", n)) => match n.parse() {
                Ok(num_classes) if num_classes > 0 => Ok(Task::Classification { num_classes }),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Ranking => write!(f, "ranking"),
            Task::Classification { num_classes } => write!(f, "classification:{num_classes}"),
        }
    }
}
