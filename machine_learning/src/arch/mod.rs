pub mod activations;
mod builder;
mod graph;
pub mod layers;
mod layout;
mod shape;

pub use builder::GraphBuilder;
pub use graph::{Graph, LayerEntry, LayerId, Mode, Node, NodeId};
pub use layout::ParamLayout;
pub use shape::Shape;
