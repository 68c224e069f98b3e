use machine_learning::arch::{Graph, GraphBuilder};
use ndarray::Array2;
use text_matching::{
    ModelErr,
    engine::{LEFT_INPUT, MatchModel, ParamTable, ParamValue, RIGHT_INPUT},
    models::{ArcI, ArcIParams},
    preprocessors::{Context, Preprocessor},
};

fn model_with(params: ArcIParams) -> ArcI {
    let mut model = ArcI::new(params);
    model.guess_and_fill_missing_params(&Context {
        vocab_size: Some(40),
        input_length: Some(20),
    });
    model
}

fn built(params: ArcIParams) -> ArcI {
    let mut model = model_with(params);
    model.build(GraphBuilder::new(Some(0))).unwrap();
    model
}

fn block_params(n: usize, padding: &str) -> ArcIParams {
    let mut params = ArcIParams::default();
    params.set("num_blocks", n.into()).unwrap();
    for name in ["left_filters", "right_filters"] {
        params.set(name, vec![6i64; n].into()).unwrap();
    }
    for name in ["left_kernel_sizes", "right_kernel_sizes"] {
        params.set(name, vec![2i64; n + 1].into()).unwrap();
    }
    for name in ["left_pool_sizes", "right_pool_sizes"] {
        params.set(name, vec![1i64; n + 2].into()).unwrap();
    }
    params.set("padding", padding.into()).unwrap();
    params
}

fn backend(model: &ArcI) -> &Graph {
    model.backend().expect("model should be built")
}

#[test]
fn any_long_enough_table_builds_two_inputs_one_output() {
    for n in 1..=4 {
        for padding in ["same", "valid", "causal"] {
            let model = built(block_params(n, padding));
            let graph = backend(&model);

            assert_eq!(graph.inputs().len(), 2, "num_blocks = {n}, padding = {padding}");
            assert_eq!(graph.outputs().len(), 1, "num_blocks = {n}, padding = {padding}");
        }
    }
}

#[test]
fn inputs_have_the_configured_length() {
    let mut params = ArcIParams::default();
    params.set("input_length", 24usize.into()).unwrap();

    let model = built(params);
    let graph = backend(&model);
    let shapes = graph.input_shapes();

    assert_eq!(shapes[0], shapes[1]);
    assert_eq!(shapes[0].dims(), &[24]);

    let names: Vec<&str> = graph
        .inputs()
        .iter()
        .map(|&id| graph.node(id).unwrap().name())
        .collect();
    assert_eq!(names, vec![LEFT_INPUT, RIGHT_INPUT]);
}

#[test]
fn both_branches_share_the_embedding() {
    let model = built(ArcIParams::default());
    let graph = backend(&model);
    let embedding = graph.find_layer("embedding").unwrap();

    let users: Vec<_> = graph
        .nodes()
        .iter()
        .filter(|node| node.layer() == Some(embedding))
        .collect();
    assert_eq!(users.len(), 2);

    let [left, right] = [0, 1].map(|i| graph.node(graph.inputs()[i]).unwrap().name().to_string());
    let sources: Vec<&str> = users
        .iter()
        .map(|node| graph.node(node.inputs()[0]).unwrap().name())
        .collect();
    assert_eq!(sources, vec![left.as_str(), right.as_str()]);

    // One table: 40 tokens of 300 dims, counted once.
    assert_eq!(graph.layer(embedding).unwrap().size(), 40 * 300);
    assert_eq!(graph.layer(embedding).unwrap().applications(), 2);
}

#[test]
fn dropout_rate_does_not_change_shapes() {
    let mut with_dropout = ArcIParams::default();
    with_dropout.set("dropout_rate", 0.5f64.into()).unwrap();
    let mut without = with_dropout.clone();
    without.set("dropout_rate", 0.0f64.into()).unwrap();

    let a = built(with_dropout);
    let b = built(without);
    let (a, b) = (backend(&a), backend(&b));

    assert_eq!(a.input_shapes(), b.input_shapes());
    assert_eq!(a.output_shapes(), b.output_shapes());
    assert_eq!(a.size(), b.size());
}

#[test]
fn documented_example_builds() {
    let mut params = ArcIParams::default();
    params.set("num_blocks", 1usize.into()).unwrap();
    params.set("left_filters", vec![32i64].into()).unwrap();
    params.set("left_kernel_sizes", vec![3i64].into()).unwrap();
    params.set("left_pool_sizes", vec![2i64].into()).unwrap();
    params.set("right_filters", vec![32i64].into()).unwrap();
    params.set("right_kernel_sizes", vec![3i64].into()).unwrap();
    params.set("right_pool_sizes", vec![4i64].into()).unwrap();
    params.set("conv_activation_func", "relu".into()).unwrap();

    let mut model = ArcI::new(params);
    model.guess_and_fill_missing_params(&Context::default());
    model.build(GraphBuilder::new(Some(1))).unwrap();

    let graph = backend(&model);
    assert_eq!(graph.inputs().len(), 2);
    assert_ne!(graph.inputs()[0], graph.inputs()[1]);
    assert_eq!(graph.outputs().len(), 1);

    // 30 / 2 = 15 steps on the left and (30 - 4) / 4 + 1 = 7 on the right.
    let concat = graph
        .nodes()
        .iter()
        .find(|node| node.name() == "concatenate")
        .unwrap();
    assert_eq!(concat.shape().dims(), &[22, 32]);
}

#[test]
fn short_block_lists_fail_at_build_time() {
    let mut model = model_with(ArcIParams::default());

    model.params_mut().set("num_blocks", 2usize.into()).unwrap();
    assert_eq!(model.params().left_filters.len(), 1);
    assert!(model.backend().is_none());

    let err = model.build(GraphBuilder::new(Some(0))).unwrap_err();
    assert!(matches!(
        err,
        ModelErr::BlockIndex {
            param: "left_filters",
            index: 1,
            len: 1,
        }
    ));
    assert!(model.backend().is_none());
}

#[test]
fn unknown_names_are_lookup_errors() {
    let mut params = ArcIParams::default();
    let before = params.clone();

    assert!(matches!(
        params.set("num_layers", 3usize.into()),
        Err(ModelErr::UnknownParam(name)) if name == "num_layers"
    ));
    assert!(matches!(params.get("num_layers"), Err(ModelErr::UnknownParam(_))));
    assert!(!params.contains("num_layers"));
    assert_eq!(params, before);
    assert_eq!(params.names().len(), 16);
}

#[test]
fn missing_base_params_fail_the_build() {
    let mut model = ArcI::new(ArcIParams::default());

    assert!(!model.params().is_complete());
    assert!(matches!(
        model.build(GraphBuilder::new(Some(0))),
        Err(ModelErr::MissingParam("input_length"))
    ));
}

#[test]
fn rebuilding_replaces_the_backend() {
    let mut model = built(ArcIParams::default());
    let before = backend(&model).size();

    model.params_mut().set("left_filters", vec![8i64].into()).unwrap();
    model.params_mut().set("right_filters", vec![8i64].into()).unwrap();
    model.build(GraphBuilder::new(Some(0))).unwrap();

    assert!(backend(&model).size() < before);
}

#[test]
fn same_seed_same_model() {
    let a = built(ArcIParams::default());
    let b = built(ArcIParams::default());

    assert_eq!(backend(&a).params(), backend(&b).params());
}

#[test]
fn predicts_from_raw_text() {
    let mut preprocessor = ArcI::default_preprocessor();
    preprocessor.fit(&[
        "what is rust",
        "rust is a systems programming language",
        "how tall is mount everest",
        "everest is 8849 metres tall",
    ]);

    let mut model = ArcI::new(ArcIParams::default());
    model.guess_and_fill_missing_params(&preprocessor.context());
    model.build(GraphBuilder::new(Some(9))).unwrap();

    let left = preprocessor
        .transform_batch(&["what is rust", "how tall is mount everest"])
        .unwrap();
    let right = preprocessor
        .transform_batch(&["rust is a language", "everest is tall"])
        .unwrap();

    let scores = model.predict(left.view(), right.view()).unwrap();
    assert_eq!(scores.dim(), (2, 1));
    assert!(scores.iter().all(|s| s.is_finite()));
}

#[test]
fn predict_needs_a_backend() {
    let model = ArcI::new(ArcIParams::default());
    let batch = Array2::<f32>::zeros((1, 30));

    assert!(matches!(
        model.predict(batch.view(), batch.view()),
        Err(ModelErr::NotBuilt)
    ));
}

#[test]
fn pretrained_embeddings_replace_the_table() {
    let mut model = built(ArcIParams::default());
    let embedding = backend(&model).find_layer("embedding").unwrap();

    let matrix = Array2::from_shape_fn((40, 300), |(row, col)| (row * 300 + col) as f32 * 1e-4);
    model.load_embedding_matrix(matrix.view()).unwrap();
    assert_eq!(
        backend(&model).layer_params(embedding).unwrap(),
        matrix.as_slice().unwrap()
    );

    let wrong = Array2::<f32>::zeros((39, 300));
    assert!(matches!(
        model.load_embedding_matrix(wrong.view()),
        Err(ModelErr::InvalidValue { .. })
    ));
}

#[test]
fn search_spaces_contain_the_defaults() {
    let params = ArcI::default_params();

    for (name, space) in params.hyper_spaces() {
        let value = params.get(name).unwrap().unwrap();
        assert!(space.contains(&value), "default {name} = {value} not in {space:?}");
    }
    assert!(!params.hyper_spaces()["dropout_rate"].contains(&ParamValue::Float(0.85)));
}
