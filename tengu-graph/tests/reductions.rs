use std::collections::HashMap;

use pretty_assertions::assert_eq;
use tengu_backend::Dtype;
use tengu_graph::{Attr, Evaluator, HostValue, Node, Op, Options, Scalar};

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

fn sum_with_axis(x: Node, axis: Option<i64>, out_shape: Vec<usize>) -> Node {
    let options = match axis {
        Some(a) => Options::new().with("axis", Attr::Int(a)),
        None => Options::new(),
    };
    Node::operation("s", Op::Sum, vec![x], options, Dtype::Fp32, out_shape)
}

#[tokio::test]
async fn sums_rows_with_axis_zero() {
    let evaluator = Evaluator::new().await.unwrap();
    let x = Node::constant("x", Dtype::Fp32, vec![2, 2], mat(&[&[1.0, 2.0], &[3.0, 4.0]]));
    let s = sum_with_axis(x, Some(0), vec![2]);
    assert_eq!(flat_fp32(&evaluator.run(&s, HashMap::new()).unwrap()), vec![4.0, 6.0]);
}

#[tokio::test]
async fn sums_columns_with_axis_one() {
    let evaluator = Evaluator::new().await.unwrap();
    let x = Node::constant("x", Dtype::Fp32, vec![2, 2], mat(&[&[1.0, 2.0], &[3.0, 4.0]]));
    let s = sum_with_axis(x, Some(1), vec![2]);
    assert_eq!(flat_fp32(&evaluator.run(&s, HashMap::new()).unwrap()), vec![3.0, 7.0]);
}

#[tokio::test]
async fn sums_every_axis_when_none_given() {
    let evaluator = Evaluator::new().await.unwrap();
    let x = Node::constant("x", Dtype::Fp32, vec![2, 2], mat(&[&[1.0, 2.0], &[3.0, 4.0]]));
    let s = sum_with_axis(x, None, vec![]);
    assert_eq!(flat_fp32(&evaluator.run(&s, HashMap::new()).unwrap()), vec![10.0]);
}

#[tokio::test]
async fn reshape_with_inferred_dimension() {
    let evaluator = Evaluator::new().await.unwrap();
    let x = Node::constant(
        "x",
        Dtype::Int32,
        vec![6],
        HostValue::Array((1..=6).map(HostValue::int32).collect()),
    );
    let new_shape = Node::constant("new_shape", Dtype::Int32, vec![2], HostValue::Array(vec![HostValue::int32(-1), HostValue::int32(2)]));
    let reshaped = Node::operation("reshaped", Op::Reshape, vec![x, new_shape], Options::new(), Dtype::Int32, vec![3, 2]);

    let result = evaluator.run(&reshaped, HashMap::new()).unwrap();
    let ints: Vec<i32> = result
        .flatten()
        .into_iter()
        .map(|s| match s {
            Scalar::Int32(v) => v,
            other => panic!("expected int32 scalar, got {other:?}"),
        })
        .collect();
    assert_eq!(ints, vec![1, 2, 3, 4, 5, 6]);
}
