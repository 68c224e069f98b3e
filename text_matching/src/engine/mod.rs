mod base_model;
mod hyper_space;
mod param;
mod task;

pub use base_model::{
    BaseParams, DEFAULT_EMBEDDING_DIM, DEFAULT_INPUT_LENGTH, DEFAULT_VOCAB_SIZE, EMBEDDING,
    LEFT_INPUT, MatchModel, OptimizerKind, RIGHT_INPUT, make_embedding_layer, make_inputs,
    make_output_layer,
};
pub use hyper_space::HyperSpace;
pub use param::{HyperSpaces, ParamTable, ParamValue};
pub use task::Task;
