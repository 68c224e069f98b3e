use std::env;

use anyhow::Context as _;
use log::info;
use machine_learning::arch::GraphBuilder;
use text_matching::{
    engine::MatchModel,
    models::{ArcI, ArcIParams},
    preprocessors::{NaivePreprocessor, Preprocessor},
};

const SEED: u64 = 42;

const LEFT: [&str; 3] = [
    "How do I bake sourdough bread at home?",
    "What is the capital of France?",
    "Best way to learn Rust",
];

const RIGHT: [&str; 3] = [
    "A beginner guide to baking sourdough bread in a home oven.",
    "Paris is the capital and largest city of France.",
    "Tomatoes grow best in warm weather.",
];

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let params = match env::args().nth(1) {
        Some(path) => ArcIParams::load(&path).with_context(|| format!("loading {path}"))?,
        None => ArcI::default_params(),
    };

    let length = params.base.input_length.unwrap_or(NaivePreprocessor::default().fixed_length());
    let mut preprocessor = NaivePreprocessor::new(length);
    preprocessor.fit(&[LEFT, RIGHT].concat());

    let mut model = ArcI::new(params);
    model.guess_and_fill_missing_params(&preprocessor.context());
    model.build(GraphBuilder::new(Some(SEED)))?;

    let graph = model.backend().context("model has no backend after building")?;
    println!("{graph}");

    let left = preprocessor.transform_batch(&LEFT)?;
    let right = preprocessor.transform_batch(&RIGHT)?;
    let predictions = model.predict(left.view(), right.view())?;

    for (pair, row) in predictions.rows().into_iter().enumerate() {
        let scores = format!("{row}");
        info!(pair = pair, scores = scores.as_str(); "prediction");
        println!("{} <> {}: {row}", LEFT[pair], RIGHT[pair]);
    }

    Ok(())
}
