use std::{fs::File, io::BufReader, path::Path};

use log::{debug, info};
use machine_learning::arch::{
    Graph, GraphBuilder, NodeId,
    activations::Activation,
    layers::{Layer, Padding},
};
use serde::{Deserialize, Serialize};

use crate::{
    ModelErr, Result,
    engine::{
        BaseParams, HyperSpace, HyperSpaces, MatchModel, ParamTable, ParamValue,
        make_embedding_layer, make_inputs, make_output_layer,
    },
};

/// The parameters of an `ArcI` model.
///
/// Every per-block list needs at least `num_blocks` entries, which is only checked when the
/// model is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcIParams {
    #[serde(flatten)]
    pub base: BaseParams,
    pub num_blocks: usize,
    pub left_filters: Vec<usize>,
    pub left_kernel_sizes: Vec<usize>,
    pub right_filters: Vec<usize>,
    pub right_kernel_sizes: Vec<usize>,
    pub conv_activation_func: Activation,
    pub left_pool_sizes: Vec<usize>,
    pub right_pool_sizes: Vec<usize>,
    pub padding: Padding,
    pub dropout_rate: f32,
}

impl Default for ArcIParams {
    fn default() -> Self {
        Self {
            base: BaseParams::default(),
            num_blocks: 1,
            left_filters: vec![32],
            left_kernel_sizes: vec![3],
            right_filters: vec![32],
            right_kernel_sizes: vec![3],
            conv_activation_func: Activation::Relu,
            left_pool_sizes: vec![2],
            right_pool_sizes: vec![2],
            padding: Padding::Same,
            dropout_rate: 0.0,
        }
    }
}

impl ArcIParams {
    const NAMES: &'static [&'static str] = &[
        "task",
        "input_length",
        "optimizer",
        "embedding_input_dim",
        "embedding_output_dim",
        "embedding_trainable",
        "num_blocks",
        "left_filters",
        "left_kernel_sizes",
        "right_filters",
        "right_kernel_sizes",
        "conv_activation_func",
        "left_pool_sizes",
        "right_pool_sizes",
        "padding",
        "dropout_rate",
    ];

    /// Reads a table from a JSON file, entries it doesn't name keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let params: Self = serde_json::from_reader(BufReader::new(file))?;
        params.validate()?;
        Ok(params)
    }

    /// Checks every set value against the same rules `set` enforces.
    pub fn validate(&self) -> Result<()> {
        let mut probe = self.clone();
        for name in self.names() {
            if let Some(value) = self.get(name)? {
                probe.set(name, value)?;
            }
        }

        Ok(())
    }

    /// The `(filters, kernel_size, pool_size)` of block `i` of a branch.
    fn block(&self, branch: Branch, i: usize) -> Result<(usize, usize, usize)> {
        let (filters, kernels, pools) = match branch {
            Branch::Left => (
                ("left_filters", self.left_filters.as_slice()),
                ("left_kernel_sizes", self.left_kernel_sizes.as_slice()),
                ("left_pool_sizes", self.left_pool_sizes.as_slice()),
            ),
            Branch::Right => (
                ("right_filters", self.right_filters.as_slice()),
                ("right_kernel_sizes", self.right_kernel_sizes.as_slice()),
                ("right_pool_sizes", self.right_pool_sizes.as_slice()),
            ),
        };

        Ok((nth(filters, i)?, nth(kernels, i)?, nth(pools, i)?))
    }

    /// Applies block `i` of `branch` on top of `x`.
    fn conv_pool_block(
        &self,
        ctx: &mut GraphBuilder,
        branch: Branch,
        i: usize,
        x: NodeId,
    ) -> Result<NodeId> {
        let (filters, kernel_size, pool_size) = self.block(branch, i)?;
        let side = branch.name();

        let conv = Layer::conv1d(filters, kernel_size, self.padding, self.conv_activation_func);
        let x = ctx.call(format!("conv1d_{side}_{i}"), conv, &[x])?;
        let x = ctx.call(format!("max_pooling1d_{side}_{i}"), Layer::max_pool1d(pool_size), &[x])?;

        Ok(x)
    }
}

fn nth((param, values): (&'static str, &[usize]), index: usize) -> Result<usize> {
    values.get(index).copied().ok_or(ModelErr::BlockIndex {
        param,
        index,
        len: values.len(),
    })
}

#[derive(Debug, Clone, Copy)]
enum Branch {
    Left,
    Right,
}

impl Branch {
    fn name(self) -> &'static str {
        match self {
            Branch::Left => "left",
            Branch::Right => "right",
        }
    }
}

impl ParamTable for ArcIParams {
    fn names(&self) -> &'static [&'static str] {
        Self::NAMES
    }

    fn get(&self, name: &str) -> Result<Option<ParamValue>> {
        if self.base.contains(name) {
            return self.base.get(name);
        }

        let value = match name {
            "num_blocks" => ParamValue::from(self.num_blocks),
            "left_filters" => ParamValue::from(self.left_filters.as_slice()),
            "left_kernel_sizes" => ParamValue::from(self.left_kernel_sizes.as_slice()),
            "right_filters" => ParamValue::from(self.right_filters.as_slice()),
            "right_kernel_sizes" => ParamValue::from(self.right_kernel_sizes.as_slice()),
            "conv_activation_func" => ParamValue::from(self.conv_activation_func.name()),
            "left_pool_sizes" => ParamValue::from(self.left_pool_sizes.as_slice()),
            "right_pool_sizes" => ParamValue::from(self.right_pool_sizes.as_slice()),
            "padding" => ParamValue::from(self.padding.to_string()),
            "dropout_rate" => ParamValue::from(self.dropout_rate),
            _ => return Err(ModelErr::UnknownParam(name.to_string())),
        };

        Ok(Some(value))
    }

    fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        if self.base.contains(name) {
            return self.base.set(name, value);
        }

        match name {
            "num_blocks" => self.num_blocks = value.into_positive(name)?,
            "left_filters" => self.left_filters = value.into_positive_list(name)?,
            "left_kernel_sizes" => self.left_kernel_sizes = value.into_positive_list(name)?,
            "right_filters" => self.right_filters = value.into_positive_list(name)?,
            "right_kernel_sizes" => self.right_kernel_sizes = value.into_positive_list(name)?,
            "conv_activation_func" => self.conv_activation_func = value.parse(name)?,
            "left_pool_sizes" => self.left_pool_sizes = value.into_positive_list(name)?,
            "right_pool_sizes" => self.right_pool_sizes = value.into_positive_list(name)?,
            "padding" => self.padding = value.parse(name)?,
            "dropout_rate" => self.dropout_rate = value.into_rate(name)?,
            _ => return Err(ModelErr::UnknownParam(name.to_string())),
        }

        Ok(())
    }

    fn hyper_spaces(&self) -> HyperSpaces {
        let mut spaces = self.base.hyper_spaces();
        spaces.insert("padding", HyperSpace::choice(["same", "valid", "causal"]));
        spaces.insert(
            "dropout_rate",
            HyperSpace::QUniform {
                low: 0.0,
                high: 0.8,
                q: 0.01,
            },
        );

        spaces
    }
}

/// A siamese convolutional matcher.
///
/// Both texts go through one shared embedding, then through their own stack of convolution and
/// max pooling blocks. The two stacks are joined along the sequence axis, flattened and passed
/// through dropout to the task's output layer.
#[derive(Debug, Clone, Default)]
pub struct ArcI {
    params: ArcIParams,
    backend: Option<Graph>,
}

impl ArcI {
    pub fn new(params: ArcIParams) -> Self {
        Self {
            params,
            backend: None,
        }
    }
}

impl MatchModel for ArcI {
    type Params = ArcIParams;

    fn default_params() -> ArcIParams {
        ArcIParams::default()
    }

    fn params(&self) -> &ArcIParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ArcIParams {
        &mut self.params
    }

    fn base_params_mut(&mut self) -> &mut BaseParams {
        &mut self.params.base
    }

    fn build(&mut self, mut ctx: GraphBuilder) -> Result<()> {
        let params = &self.params;

        let (text_left, text_right) = make_inputs(&mut ctx, &params.base)?;
        let embedding = make_embedding_layer(&mut ctx, &params.base)?;
        let mut left = ctx.apply(embedding, &[text_left])?;
        let mut right = ctx.apply(embedding, &[text_right])?;

        for i in 0..params.num_blocks {
            left = params.conv_pool_block(&mut ctx, Branch::Left, i, left)?;
            right = params.conv_pool_block(&mut ctx, Branch::Right, i, right)?;

            let left_shape = ctx.shape(left)?.to_string();
            let right_shape = ctx.shape(right)?.to_string();
            debug!(
                block = i,
                left = left_shape.as_str(),
                right = right_shape.as_str();
                "wired block"
            );
        }

        let x = ctx.call("concatenate", Layer::concatenate(1), &[left, right])?;
        let x = ctx.call("flatten", Layer::flatten(), &[x])?;
        let x = ctx.call("dropout", Layer::dropout(params.dropout_rate)?, &[x])?;
        let output = ctx.call("output", make_output_layer(&params.base)?, &[x])?;

        let graph = ctx.finish(&[text_left, text_right], &[output])?;
        info!(blocks = params.num_blocks, params = graph.size(); "built ArcI");

        self.backend = Some(graph);
        Ok(())
    }

    fn backend(&self) -> Option<&Graph> {
        self.backend.as_ref()
    }

    fn backend_mut(&mut self) -> Option<&mut Graph> {
        self.backend.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Task;

    fn filled() -> ArcIParams {
        let mut params = ArcIParams::default();
        params.base = BaseParams {
            task: Some(Task::Ranking),
            input_length: Some(10),
            embedding_input_dim: Some(50),
            embedding_output_dim: Some(8),
            embedding_trainable: Some(true),
            ..Default::default()
        };

        params
    }

    #[test]
    fn defaults() {
        let params = ArcI::default_params();

        assert_eq!(params.num_blocks, 1);
        assert_eq!(params.left_filters, vec![32]);
        assert_eq!(params.right_kernel_sizes, vec![3]);
        assert_eq!(params.right_pool_sizes, vec![2]);
        assert_eq!(params.conv_activation_func, Activation::Relu);
        assert_eq!(params.padding, Padding::Same);
        assert_eq!(params.dropout_rate, 0.0);
        assert_eq!(params.names().len(), 16);
    }

    #[test]
    fn search_spaces() {
        let spaces = ArcI::default_params().hyper_spaces();

        assert_eq!(spaces.len(), 3);
        assert!(spaces["optimizer"].contains(&"adagrad".into()));
        assert!(spaces["padding"].contains(&"causal".into()));
        assert!(spaces["dropout_rate"].contains(&ParamValue::Float(0.5)));
        assert!(!spaces["dropout_rate"].contains(&ParamValue::Float(0.9)));
    }

    #[test]
    fn set_by_name() {
        let mut params = ArcIParams::default();

        params.set("num_blocks", 2usize.into()).unwrap();
        params.set("left_filters", vec![16i64, 8].into()).unwrap();
        params.set("conv_activation_func", "tanh".into()).unwrap();
        params.set("padding", "valid".into()).unwrap();
        params.set("dropout_rate", 0.3f64.into()).unwrap();

        assert_eq!(params.num_blocks, 2);
        assert_eq!(params.left_filters, vec![16, 8]);
        assert_eq!(params.conv_activation_func, Activation::Tanh);
        assert_eq!(params.padding, Padding::Valid);
        assert!((params.dropout_rate - 0.3).abs() < 1e-6);
        assert_eq!(params.get("left_filters").unwrap(), Some(vec![16i64, 8].into()));
    }

    #[test]
    fn bad_values_leave_the_table_untouched() {
        let mut params = ArcIParams::default();
        let before = params.clone();

        assert!(params.set("conv_activation_func", "swish".into()).is_err());
        assert!(params.set("padding", "reflect".into()).is_err());
        assert!(params.set("padding", "SAME".into()).is_err());
        assert!(params.set("conv_activation_func", "ReLU".into()).is_err());
        assert!(params.set("dropout_rate", 1.0f64.into()).is_err());
        assert!(params.set("right_pool_sizes", vec![2i64, -1].into()).is_err());
        assert!(params.set("num_blocks", "two".into()).is_err());
        assert_eq!(params, before);
    }

    #[test]
    fn json_keeps_defaults_for_what_it_omits() {
        let json = r#"{
            "task": "ranking",
            "input_length": 12,
            "num_blocks": 2,
            "left_filters": [8, 8],
            "conv_activation_func": "tanh",
            "padding": "causal"
        }"#;

        let params: ArcIParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.base.task, Some(Task::Ranking));
        assert_eq!(params.base.input_length, Some(12));
        assert_eq!(params.num_blocks, 2);
        assert_eq!(params.left_filters, vec![8, 8]);
        assert_eq!(params.right_filters, vec![32]);
        assert_eq!(params.padding, Padding::Causal);
        assert!(params.validate().is_ok());

        let json = serde_json::to_string(&params).unwrap();
        let back: ArcIParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn validate_catches_bad_json() {
        let params: ArcIParams = serde_json::from_str(r#"{"num_blocks": 0}"#).unwrap();
        assert!(matches!(
            params.validate(),
            Err(ModelErr::InvalidValue { param, .. }) if param == "num_blocks"
        ));
    }

    #[test]
    fn block_names_and_layers() {
        let mut model = ArcI::new(filled());
        model.build(GraphBuilder::new(Some(3))).unwrap();
        let graph = model.backend().unwrap();

        for name in [
            "embedding",
            "conv1d_left_0",
            "max_pooling1d_left_0",
            "conv1d_right_0",
            "max_pooling1d_right_0",
            "concatenate",
            "flatten",
            "dropout",
            "output",
        ] {
            assert!(graph.find_layer(name).is_some(), "missing layer {name}");
        }

        let output = graph.output_shapes();
        assert_eq!(output[0].dims(), &[1]);
    }

    #[test]
    fn concatenation_is_along_the_sequence() {
        let mut params = filled();
        params.right_pool_sizes = vec![5];

        let mut model = ArcI::new(params);
        model.build(GraphBuilder::new(Some(3))).unwrap();
        let graph = model.backend().unwrap();

        let concat = graph
            .nodes()
            .iter()
            .find(|node| node.name() == "concatenate")
            .unwrap();
        assert_eq!(concat.shape().dims(), &[5 + 2, 32]);
    }

    #[test]
    fn failed_build_keeps_the_previous_graph() {
        let mut model = ArcI::new(filled());
        model.build(GraphBuilder::new(Some(3))).unwrap();
        let size = model.backend().unwrap().size();

        model.params_mut().num_blocks = 3;
        let err = model.build(GraphBuilder::new(Some(3))).unwrap_err();

        assert!(matches!(
            err,
            ModelErr::BlockIndex {
                param: "left_filters",
                index: 1,
                len: 1
            }
        ));
        assert_eq!(model.backend().unwrap().size(), size);
    }

    #[test]
    fn mismatched_branch_widths_fail_in_the_layers() {
        let mut params = filled();
        params.right_filters = vec![16];

        let err = ArcI::new(params).build(GraphBuilder::new(Some(3))).unwrap_err();
        assert!(matches!(err, ModelErr::Ml(_)));
    }

    #[test]
    fn classification_outputs_probabilities() {
        let mut params = filled();
        params.base.task = Some(Task::Classification { num_classes: 3 });

        let mut model = ArcI::new(params);
        model.build(GraphBuilder::new(Some(5))).unwrap();

        let left = ndarray::Array2::from_shape_fn((2, 10), |(b, t)| ((b * 7 + t) % 50) as f32);
        let right = ndarray::Array2::from_shape_fn((2, 10), |(b, t)| ((b + t * 3) % 50) as f32);
        let probs = model.predict(left.view(), right.view()).unwrap();

        assert_eq!(probs.dim(), (2, 3));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }
}
