use std::{cell::RefCell, rc::Rc};

use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use super::{
    Graph, LayerId, NodeId, Shape,
    graph::{LayerEntry, Node, Op},
    layers::Layer,
    layout::ParamLayout,
};
use crate::{MlErr, Result};

/// The context a graph is wired in.
///
/// Layers are registered once and applied to nodes any number of times, every application of
/// the same layer shares its weights. Parameters are allocated and initialized the first time a
/// layer is applied, once its input shapes are known.
pub struct GraphBuilder {
    nodes: Vec<Node>,
    layers: Vec<LayerEntry>,
    params: Vec<f32>,
    rng: Rc<RefCell<StdRng>>,
}

impl GraphBuilder {
    /// Creates a new `GraphBuilder`.
    ///
    /// # Arguments
    /// * `seed` - Seeds the rng used to initialize the parameters, `None` seeds it from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            nodes: Vec::new(),
            layers: Vec::new(),
            params: Vec::new(),
            rng: Rc::new(RefCell::new(rng)),
        }
    }

    /// Adds an input placeholder.
    ///
    /// # Arguments
    /// * `name` - The name of the input.
    /// * `shape` - The per-example shape of the input.
    pub fn input(&mut self, name: impl Into<String>, shape: impl Into<Shape>) -> NodeId {
        self.push(Node {
            name: name.into(),
            op: Op::Input,
            shape: shape.into(),
        })
    }

    /// Registers a layer without applying it.
    pub fn layer(&mut self, name: impl Into<String>, layer: Layer) -> LayerId {
        self.layers.push(LayerEntry {
            name: name.into(),
            layer,
            layout: None,
            applications: 0,
        });

        LayerId(self.layers.len() - 1)
    }

    /// Applies a registered layer to some nodes.
    ///
    /// # Returns
    /// The node holding the layer's output, or an error if the layer can't take the inputs'
    /// shapes or, for a layer that was already applied, if they don't match its weights.
    pub fn apply(&mut self, layer: LayerId, inputs: &[NodeId]) -> Result<NodeId> {
        let shapes = inputs
            .iter()
            .map(|&id| self.shape(id).cloned())
            .collect::<Result<Vec<_>>>()?;
        let shapes: Vec<&Shape> = shapes.iter().collect();

        let entry = self.layers.get(layer.0).ok_or(MlErr::UnknownLayer(layer.0))?;
        let shape = entry.layer.output_shape(&shapes)?;
        let param_shapes = entry.layer.param_shapes(&shapes)?;

        match entry.layout.as_ref().map(|l| l.shapes() == param_shapes.as_slice()) {
            Some(true) => {}
            Some(false) => {
                return Err(MlErr::ParamShapeMismatch {
                    layer: entry.name.clone(),
                });
            }
            None => self.allocate(layer, param_shapes)?,
        }

        let entry = &mut self.layers[layer.0];
        let name = match entry.applications {
            0 => entry.name.clone(),
            n => format!("{}_{n}", entry.name),
        };
        entry.applications += 1;

        Ok(self.push(Node {
            name,
            op: Op::Apply {
                layer,
                inputs: inputs.to_vec(),
            },
            shape,
        }))
    }

    /// Registers `layer` under `name` and applies it right away.
    pub fn call(
        &mut self,
        name: impl Into<String>,
        layer: Layer,
        inputs: &[NodeId],
    ) -> Result<NodeId> {
        let layer = self.layer(name, layer);
        self.apply(layer, inputs)
    }

    /// The per-example shape of a node.
    pub fn shape(&self, node: NodeId) -> Result<&Shape> {
        self.nodes
            .get(node.0)
            .map(|node| &node.shape)
            .ok_or(MlErr::UnknownNode(node.0))
    }

    /// Freezes the builder into a graph.
    ///
    /// # Arguments
    /// * `inputs` - The placeholders fed on each forward pass, in order.
    /// * `outputs` - The nodes returned by each forward pass, in order.
    pub fn finish(self, inputs: &[NodeId], outputs: &[NodeId]) -> Result<Graph> {
        for id in inputs.iter().chain(outputs) {
            self.shape(*id)?;
        }

        if let Some(node) = inputs.iter().map(|id| &self.nodes[id.0]).find(|n| !n.is_input()) {
            return Err(MlErr::NotAnInput(node.name.clone()));
        }

        debug!(nodes = self.nodes.len(), params = self.params.len(); "graph finished");

        Ok(Graph {
            nodes: self.nodes,
            layers: self.layers,
            params: self.params,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        })
    }

    fn allocate(&mut self, layer: LayerId, shapes: Vec<Vec<usize>>) -> Result<()> {
        let start = self.params.len();
        let initializers = self.layers[layer.0].layer.initializers();

        for (shape, init) in shapes.iter().zip(initializers) {
            let mut param_gen = init.param_gen(&self.rng, shape)?;
            self.params.extend(param_gen.sample_all());
        }

        let layout = ParamLayout::new(start, shapes);
        let entry = &mut self.layers[layer.0];
        debug!(layer = entry.name.as_str(), params = layout.size(); "allocated parameters");
        entry.layout = Some(layout);

        Ok(())
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}
