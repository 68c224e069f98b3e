use std::fmt;

use ndarray::{ArrayD, ArrayViewD};
use rand::rngs::StdRng;

use super::{Shape, layers::Layer, layout::ParamLayout};
use crate::{MlErr, Result};

/// Identifies a node (a tensor) of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identifies a layer of a graph. A layer applied to several nodes keeps a single id, and with
/// it a single set of weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// How a forward pass treats layers that behave differently while training (dropout).
pub enum Mode<'r> {
    Infer,
    Train(&'r mut StdRng),
}

#[derive(Debug, Clone)]
pub(crate) enum Op {
    Input,
    Apply { layer: LayerId, inputs: Vec<NodeId> },
}

/// A tensor of the graph: either an input placeholder or the output of applying a layer.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) op: Op,
    pub(crate) shape: Shape,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The per-example shape of this node.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn is_input(&self) -> bool {
        matches!(self.op, Op::Input)
    }

    /// The layer producing this node, `None` for inputs.
    pub fn layer(&self) -> Option<LayerId> {
        match self.op {
            Op::Input => None,
            Op::Apply { layer, .. } => Some(layer),
        }
    }

    pub fn inputs(&self) -> &[NodeId] {
        match &self.op {
            Op::Input => &[],
            Op::Apply { inputs, .. } => inputs,
        }
    }
}

/// A named layer together with its place in the parameter buffer.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    pub(crate) name: String,
    pub(crate) layer: Layer,
    pub(crate) layout: Option<ParamLayout>,
    pub(crate) applications: usize,
}

impl LayerEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// `None` until the layer is applied for the first time.
    pub fn layout(&self) -> Option<&ParamLayout> {
        self.layout.as_ref()
    }

    /// The amount of parameters this layer owns.
    pub fn size(&self) -> usize {
        self.layout.as_ref().map_or(0, ParamLayout::size)
    }

    /// How many nodes this layer produced.
    pub fn applications(&self) -> usize {
        self.applications
    }
}

/// An immutable computation graph produced by a `GraphBuilder`.
///
/// Nodes are stored in construction order, which is a topological order since a node can only
/// be built out of nodes that already exist.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) layers: Vec<LayerEntry>,
    pub(crate) params: Vec<f32>,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) outputs: Vec<NodeId>,
}

impl Graph {
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(MlErr::UnknownNode(id.0))
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Result<&LayerEntry> {
        self.layers.get(id.0).ok_or(MlErr::UnknownLayer(id.0))
    }

    /// Looks a layer up by the name it was registered with.
    pub fn find_layer(&self, name: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .position(|entry| entry.name == name)
            .map(LayerId)
    }

    pub fn input_shapes(&self) -> Vec<&Shape> {
        self.inputs.iter().map(|id| &self.nodes[id.0].shape).collect()
    }

    pub fn output_shapes(&self) -> Vec<&Shape> {
        self.outputs.iter().map(|id| &self.nodes[id.0].shape).collect()
    }

    /// The total amount of parameters.
    pub fn size(&self) -> usize {
        self.params.len()
    }

    /// The amount of parameters a trainer may update.
    pub fn trainable_size(&self) -> usize {
        self.layers
            .iter()
            .filter(|entry| entry.layer.trainable())
            .map(LayerEntry::size)
            .sum()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// The slice of the parameter buffer owned by `layer`.
    pub fn layer_params(&self, layer: LayerId) -> Result<&[f32]> {
        let entry = self.layer(layer)?;
        Ok(entry
            .layout
            .as_ref()
            .map_or(&[][..], |layout| &self.params[layout.range()]))
    }

    /// Overwrites the parameters of `layer`, e.g. with a pretrained embedding matrix.
    ///
    /// # Returns
    /// An error if `values` doesn't have exactly as many elements as the layer has parameters.
    pub fn set_layer_params(&mut self, layer: LayerId, values: &[f32]) -> Result<()> {
        let entry = self.layer(layer)?;
        let range = entry.layout.as_ref().map_or(0..0, ParamLayout::range);

        if values.len() != range.len() {
            return Err(MlErr::SizeMismatch {
                what: "layer parameters",
                got: values.len(),
                expected: range.len(),
            });
        }

        self.params[range].copy_from_slice(values);
        Ok(())
    }

    /// Makes a forward pass through the graph.
    ///
    /// # Arguments
    /// * `inputs` - One batch per graph input, in the order the inputs were declared, each of
    ///   shape `(batch, ..input shape)`.
    /// * `mode` - Training or inference.
    ///
    /// # Returns
    /// One batch per graph output.
    pub fn forward(
        &self,
        inputs: &[ArrayViewD<f32>],
        mut mode: Mode<'_>,
    ) -> Result<Vec<ArrayD<f32>>> {
        if inputs.len() != self.inputs.len() {
            return Err(MlErr::SizeMismatch {
                what: "graph inputs",
                got: inputs.len(),
                expected: self.inputs.len(),
            });
        }

        let batch = inputs.first().and_then(|x| x.shape().first().copied()).unwrap_or(0);
        let mut values: Vec<Option<ArrayD<f32>>> = vec![None; self.nodes.len()];

        for (&id, x) in self.inputs.iter().zip(inputs) {
            let node = &self.nodes[id.0];
            if x.shape() != node.shape.with_batch(batch).as_slice() {
                return Err(MlErr::InputShapeMismatch {
                    input: node.name.clone(),
                    got: x.shape().to_vec(),
                    expected: node.shape.clone(),
                });
            }

            values[id.0] = Some(x.to_owned());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let Op::Apply { layer, inputs } = &node.op else {
                continue;
            };

            let out = {
                let args = inputs
                    .iter()
                    .map(|id| {
                        values[id.0]
                            .as_ref()
                            .map(|x| x.view())
                            .ok_or(MlErr::UnknownNode(id.0))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let params = self.layer_params(*layer)?;
                self.layers[layer.0].layer.forward(params, &args, &mut mode)?
            };

            values[i] = Some(out);
        }

        self.outputs
            .iter()
            .map(|id| values[id.0].clone().ok_or(MlErr::UnknownNode(id.0)))
            .collect()
    }
}

/// A summary of the graph: one row per node with its layer type, output shape, parameter count
/// and the nodes it was computed from. Shared layers count their parameters once.
impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(96);

        writeln!(f, "{:<34}{:<24}{:>10}  Connected to", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{rule}")?;

        let mut counted = vec![false; self.layers.len()];
        for node in &self.nodes {
            let (kind, params) = match node.layer() {
                None => ("InputLayer", 0),
                Some(layer) => {
                    let entry = &self.layers[layer.0];
                    let params = if counted[layer.0] { 0 } else { entry.size() };
                    counted[layer.0] = true;
                    (entry.layer.kind(), params)
                }
            };

            let sources: Vec<&str> = node
                .inputs()
                .iter()
                .map(|id| self.nodes[id.0].name.as_str())
                .collect();

            writeln!(
                f,
                "{:<34}{:<24}{:>10}  {}",
                format!("{} ({kind})", node.name),
                node.shape.to_string(),
                params,
                sources.join(", ")
            )?;
        }

        let trainable = self.trainable_size();
        writeln!(f, "{rule}")?;
        writeln!(f, "Total params: {}", self.size())?;
        writeln!(f, "Trainable params: {trainable}")?;
        write!(f, "Non-trainable params: {}", self.size() - trainable)
    }
}
