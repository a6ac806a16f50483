use std::collections::HashMap;

use pretty_assertions::assert_eq;
use tengu_backend::Kind;
use tengu_backend::{Dtype, Error as BackendError};
use tengu_graph::{Attr, Error, Evaluator, HostValue, Node, Op, Options, Scalar};

fn mat(rows: &[&[f32]]) -> HostValue {
    HostValue::Array(rows.iter().map(|row| HostValue::Array(row.iter().map(|&v| HostValue::fp32(v)).collect())).collect())
}

fn flat_fp32(value: &HostValue) -> Vec<f32> {
    value
        .flatten()
        .into_iter()
        .map(|s| match s {
            Scalar::Fp32(v) => v,
            other => panic!("expected fp32 scalar, got {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn adds_two_matrices_elementwise() {
    let evaluator = Evaluator::new().await.unwrap();
    let a = Node::constant("a", Dtype::Fp32, vec![2, 2], mat(&[&[1.0, 2.0], &[3.0, 4.0]]));
    let b = Node::constant("b", Dtype::Fp32, vec![2, 2], mat(&[&[5.0, 6.0], &[7.0, 8.0]]));
    let sum = Node::operation("sum", Op::Add, vec![a, b], Options::new(), Dtype::Fp32, vec![2, 2]);

    let result = evaluator.run(&sum, HashMap::new()).unwrap();
    assert_eq!(flat_fp32(&result), vec![6.0, 8.0, 10.0, 12.0]);
}

#[tokio::test]
async fn matmul_contracts_inner_dimension() {
    let evaluator = Evaluator::new().await.unwrap();
    let a = Node::constant("a", Dtype::Fp32, vec![2, 3], mat(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]));
    let b = Node::constant("b", Dtype::Fp32, vec![3, 1], mat(&[&[1.0], &[2.0], &[3.0]]));
    let product = Node::operation("product", Op::MatMul, vec![a, b], Options::new(), Dtype::Fp32, vec![2, 1]);

    let result = evaluator.run(&product, HashMap::new()).unwrap();
    assert_eq!(flat_fp32(&result), vec![14.0, 32.0]);
}

#[tokio::test]
async fn matmul_rejects_incompatible_transpose() {
    let evaluator = Evaluator::new().await.unwrap();
    let a = Node::constant("a", Dtype::Fp32, vec![2, 3], mat(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]));
    let b = Node::constant("b", Dtype::Fp32, vec![3, 1], mat(&[&[1.0], &[2.0], &[3.0]]));
    let options = Options::new().with("transpose_a", Attr::Bool(true));
    let product = Node::operation("product", Op::MatMul, vec![a, b], options, Dtype::Fp32, vec![3, 1]);

    let err = evaluator.run(&product, HashMap::new()).unwrap_err();
    let Error::Backend(BackendError::Execution { kind, .. }) = err else {
        panic!("expected a backend execution error, got {err:?}");
    };
    assert!(matches!(kind, Kind::ShapeMismatch(_)));
}

#[tokio::test]
async fn assign_add_mutates_variable_across_runs() {
    let evaluator = Evaluator::new().await.unwrap();
    let v = Node::variable("v", Dtype::Fp32, vec![2], Some(HostValue::Array(vec![HostValue::fp32(1.0), HostValue::fp32(1.0)])));
    let delta = Node::constant("delta", Dtype::Fp32, vec![2], HostValue::Array(vec![HostValue::fp32(0.5), HostValue::fp32(0.25)]));
    let update = Node::operation("update", Op::AssignAdd, vec![v.clone(), delta], Options::new(), Dtype::Fp32, vec![2]);

    evaluator.run(&update, HashMap::new()).unwrap();
    let after = evaluator.run(&v, HashMap::new()).unwrap();
    assert_eq!(flat_fp32(&after), vec![1.5, 1.25]);
}
