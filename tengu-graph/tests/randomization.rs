use std::collections::HashMap;

use pretty_assertions::assert_eq;
use tengu_backend::Dtype;
use tengu_graph::{EvaluatorOptions, Evaluator, HostValue, Node, Op, Options, Scalar};

fn glorot(shape: Vec<usize>) -> Node {
    Node::operation("w", Op::GlorotUniform, vec![], Options::new(), Dtype::Fp32, shape)
}

#[tokio::test]
async fn glorot_uniform_values_stay_within_bounds() {
    let evaluator = Evaluator::with_options(EvaluatorOptions::default()).await.unwrap().with_graph_seed(1);
    let w = glorot(vec![64, 64]);

    let result = evaluator.run(&w, HashMap::new()).unwrap();
    let limit = (6.0f32 / 128.0).sqrt();
    for scalar in result.flatten() {
        let Scalar::Fp32(v) = scalar else { panic!("expected fp32 scalar") };
        assert!((-limit..=limit).contains(&v), "{v} outside [-{limit}, {limit}]");
    }
}

#[tokio::test]
async fn glorot_uniform_is_deterministic_under_a_shared_graph_seed() {
    let a = Evaluator::new().await.unwrap().with_graph_seed(7);
    let b = Evaluator::new().await.unwrap().with_graph_seed(7);
    let shape = vec![8, 8];

    let x = a.run(&glorot(shape.clone()), HashMap::new()).unwrap();
    let y = b.run(&glorot(shape), HashMap::new()).unwrap();
    assert_eq!(x, y);
}
