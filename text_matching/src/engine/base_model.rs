use std::{fmt, str::FromStr};

use log::info;
use machine_learning::{
    MlErr,
    arch::{Graph, GraphBuilder, LayerId, Mode, NodeId, layers::Layer},
};
use ndarray::{Array2, ArrayView2, Ix2};
use serde::{Deserialize, Serialize};

use super::{HyperSpace, HyperSpaces, ParamTable, ParamValue, Task};
use crate::{
    ModelErr, Result,
    preprocessors::{Context, NaivePreprocessor},
};

pub const LEFT_INPUT: &str = "text_left";
pub const RIGHT_INPUT: &str = "text_right";
pub const EMBEDDING: &str = "embedding";

pub const DEFAULT_INPUT_LENGTH: usize = 30;
pub const DEFAULT_VOCAB_SIZE: usize = 300;
pub const DEFAULT_EMBEDDING_DIM: usize = 300;

/// The optimizer a trainer should compile the model with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Rmsprop,
    Adagrad,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 3] = [Self::Adam, Self::Rmsprop, Self::Adagrad];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Adam => "adam",
            Self::Rmsprop => "rmsprop",
            Self::Adagrad => "adagrad",
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = ModelErr;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|opt| opt.name() == s)
            .ok_or_else(|| ModelErr::invalid("optimizer", format!("unknown optimizer `{s}`")))
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The parameters every matching model has: its task, input length, optimizer and embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    /// Shared by both inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_length: Option<usize>,
    pub optimizer: OptimizerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_input_dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_output_dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_trainable: Option<bool>,
}

impl BaseParams {
    pub const NAMES: &'static [&'static str] = &[
        "task",
        "input_length",
        "optimizer",
        "embedding_input_dim",
        "embedding_output_dim",
        "embedding_trainable",
    ];

    pub fn task(&self) -> Result<Task> {
        self.task.ok_or(ModelErr::MissingParam("task"))
    }

    pub fn input_length(&self) -> Result<usize> {
        self.input_length.ok_or(ModelErr::MissingParam("input_length"))
    }

    pub fn embedding_input_dim(&self) -> Result<usize> {
        self.embedding_input_dim
            .ok_or(ModelErr::MissingParam("embedding_input_dim"))
    }

    pub fn embedding_output_dim(&self) -> Result<usize> {
        self.embedding_output_dim
            .ok_or(ModelErr::MissingParam("embedding_output_dim"))
    }

    pub fn embedding_trainable(&self) -> Result<bool> {
        self.embedding_trainable
            .ok_or(ModelErr::MissingParam("embedding_trainable"))
    }

    /// Fills every unset parameter with a guess, preferring what `context` knows about the data.
    /// Parameters that are already set are left alone.
    pub fn fill_missing(&mut self, context: &Context) {
        fill(&mut self.task, "task", Task::Ranking);
        fill(
            &mut self.input_length,
            "input_length",
            context.input_length.unwrap_or(DEFAULT_INPUT_LENGTH),
        );
        fill(
            &mut self.embedding_input_dim,
            "embedding_input_dim",
            context.vocab_size.unwrap_or(DEFAULT_VOCAB_SIZE),
        );
        fill(
            &mut self.embedding_output_dim,
            "embedding_output_dim",
            DEFAULT_EMBEDDING_DIM,
        );
        fill(&mut self.embedding_trainable, "embedding_trainable", true);
    }
}

fn fill<T: Copy + fmt::Display>(slot: &mut Option<T>, name: &'static str, value: T) {
    if slot.is_none() {
        let shown = value.to_string();
        info!(param = name, value = shown.as_str(); "filled missing parameter");
        *slot = Some(value);
    }
}

impl ParamTable for BaseParams {
    fn names(&self) -> &'static [&'static str] {
        Self::NAMES
    }

    fn get(&self, name: &str) -> Result<Option<ParamValue>> {
        let value = match name {
            "task" => self.task.map(|task| ParamValue::Str(task.to_string())),
            "input_length" => self.input_length.map(ParamValue::from),
            "optimizer" => Some(ParamValue::from(self.optimizer.name())),
            "embedding_input_dim" => self.embedding_input_dim.map(ParamValue::from),
            "embedding_output_dim" => self.embedding_output_dim.map(ParamValue::from),
            "embedding_trainable" => self.embedding_trainable.map(ParamValue::Bool),
            _ => return Err(ModelErr::UnknownParam(name.to_string())),
        };

        Ok(value)
    }

    fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "task" => match value {
                ParamValue::Str(s) => self.task = Some(s.parse()?),
                other => {
                    return Err(ModelErr::invalid(name, format!("expected a task, got {other}")));
                }
            },
            "input_length" => self.input_length = Some(value.into_positive(name)?),
            "optimizer" => match value {
                ParamValue::Str(s) => self.optimizer = s.parse()?,
                other => {
                    let reason = format!("expected an optimizer, got {other}");
                    return Err(ModelErr::invalid(name, reason));
                }
            },
            "embedding_input_dim" => self.embedding_input_dim = Some(value.into_positive(name)?),
            "embedding_output_dim" => self.embedding_output_dim = Some(value.into_positive(name)?),
            "embedding_trainable" => self.embedding_trainable = Some(value.into_bool(name)?),
            _ => return Err(ModelErr::UnknownParam(name.to_string())),
        }

        Ok(())
    }

    fn hyper_spaces(&self) -> HyperSpaces {
        HyperSpaces::from([(
            "optimizer",
            HyperSpace::choice(OptimizerKind::ALL.map(|opt| opt.name())),
        )])
    }
}

/// Adds the two token id placeholders, both `input_length` long.
pub fn make_inputs(ctx: &mut GraphBuilder, params: &BaseParams) -> Result<(NodeId, NodeId)> {
    let length = params.input_length()?;
    Ok((ctx.input(LEFT_INPUT, [length]), ctx.input(RIGHT_INPUT, [length])))
}

/// Registers the embedding layer both inputs go through.
pub fn make_embedding_layer(ctx: &mut GraphBuilder, params: &BaseParams) -> Result<LayerId> {
    let layer = Layer::embedding(
        params.embedding_input_dim()?,
        params.embedding_output_dim()?,
        params.embedding_trainable()?,
    );

    Ok(ctx.layer(EMBEDDING, layer))
}

pub fn make_output_layer(params: &BaseParams) -> Result<Layer> {
    Ok(params.task()?.output_layer())
}

/// A model matching a left text against a right one.
pub trait MatchModel {
    type Params: ParamTable;

    /// The parameter table with every default set.
    fn default_params() -> Self::Params
    where
        Self: Sized;

    fn default_preprocessor() -> NaivePreprocessor
    where
        Self: Sized,
    {
        NaivePreprocessor::default()
    }

    fn params(&self) -> &Self::Params;

    fn params_mut(&mut self) -> &mut Self::Params;

    fn base_params_mut(&mut self) -> &mut BaseParams;

    /// Fills the unset base parameters, see `BaseParams::fill_missing`.
    fn guess_and_fill_missing_params(&mut self, context: &Context) {
        self.base_params_mut().fill_missing(context);
    }

    /// Wires the model's graph in `ctx` and keeps it as the backend, replacing any previous one.
    /// On error the previous backend is kept.
    fn build(&mut self, ctx: GraphBuilder) -> Result<()>;

    /// The built graph, `None` before `build`.
    fn backend(&self) -> Option<&Graph>;

    fn backend_mut(&mut self) -> Option<&mut Graph>;

    /// Runs an inference pass over a batch of pairs.
    ///
    /// # Arguments
    /// * `left` - `(batch, input_length)` token ids.
    /// * `right` - `(batch, input_length)` token ids.
    ///
    /// # Returns
    /// `(batch, output_dim)` predictions.
    fn predict(&self, left: ArrayView2<f32>, right: ArrayView2<f32>) -> Result<Array2<f32>> {
        let graph = self.backend().ok_or(ModelErr::NotBuilt)?;
        let outputs = graph.forward(&[left.into_dyn(), right.into_dyn()], Mode::Infer)?;

        let output = outputs.into_iter().next().ok_or(MlErr::SizeMismatch {
            what: "graph outputs",
            got: 0,
            expected: 1,
        })?;

        Ok(output.into_dimensionality::<Ix2>().map_err(MlErr::from)?)
    }

    /// Overwrites the embedding table of the built graph with a pretrained one.
    ///
    /// # Arguments
    /// * `matrix` - `(embedding_input_dim, embedding_output_dim)` vectors, one row per token id.
    fn load_embedding_matrix(&mut self, matrix: ArrayView2<f32>) -> Result<()> {
        let graph = self.backend_mut().ok_or(ModelErr::NotBuilt)?;
        let layer = graph
            .find_layer(EMBEDDING)
            .ok_or_else(|| ModelErr::invalid("embedding_matrix", "the model has no embedding"))?;

        let Layer::Embedding(embedding) = graph.layer(layer)?.layer() else {
            return Err(ModelErr::invalid(
                "embedding_matrix",
                format!("`{EMBEDDING}` is not an embedding layer"),
            ));
        };

        let expected = (embedding.input_dim(), embedding.output_dim());
        if matrix.dim() != expected {
            return Err(ModelErr::invalid(
                "embedding_matrix",
                format!("expected shape {expected:?}, got {:?}", matrix.dim()),
            ));
        }

        let values: Vec<f32> = matrix.iter().copied().collect();
        graph.set_layer_params(layer, &values)?;
        Ok(())
    }
}
