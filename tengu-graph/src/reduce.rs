//! Host-side reduction and broadcast-gradient-axis arithmetic. Both operate on flattened scalar
//! buffers and shapes rather than device memory: the evaluator reads a buffer to host, folds here,
//! and re-uploads the result.

use crate::tensor::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Prod,
}

fn normalize_axis(axis: i64, rank: usize) -> usize {
    if axis < 0 {
        (rank as i64 + axis) as usize
    } else {
        axis as usize
    }
}

fn fold_axis(data: &[Scalar], shape: &[usize], axis: usize, op: ReduceOp) -> (Vec<Scalar>, Vec<usize>) {
    let outer: usize = shape[..axis].iter().product::<usize>().max(1);
    let axis_len = shape[axis].max(1);
    let inner: usize = shape[axis + 1..].iter().product::<usize>().max(1);

    let mut out = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let mut acc_fp = if op == ReduceOp::Sum { 0.0f32 } else { 1.0f32 };
            let mut acc_int = if op == ReduceOp::Sum { 0i32 } else { 1i32 };
            let mut is_float = false;
            for a in 0..axis_len {
                let idx = o * axis_len * inner + a * inner + i;
                match data[idx] {
                    Scalar::Fp32(v) => {
                        is_float = true;
                        acc_fp = if op == ReduceOp::Sum { acc_fp + v } else { acc_fp * v };
                    }
                    Scalar::Int32(v) => {
                        acc_int = if op == ReduceOp::Sum { acc_int + v } else { acc_int * v };
                    }
                    Scalar::Bool(v) => {
                        let v = v as i32;
                        acc_int = if op == ReduceOp::Sum { acc_int + v } else { acc_int * v };
                    }
                }
            }
            out.push(if is_float { Scalar::Fp32(acc_fp) } else { Scalar::Int32(acc_int) });
        }
    }

    let mut new_shape = shape.to_vec();
    new_shape.remove(axis);
    (out, new_shape)
}

/// Folds `flat` (laid out per `shape`) over `axes` (or every axis, if `axes` is empty — the
/// `axis=None` case), largest axis first so earlier removals never invalidate later axis indices.
/// When `keepdims`, the reduced axes are reinserted into the output shape as size-1 dimensions in
/// their original position.
pub fn reduce(op: ReduceOp, flat: &[Scalar], shape: &[usize], axes: &[i64], keepdims: bool) -> (Vec<Scalar>, Vec<usize>) {
    let rank = shape.len();
    let mut normalized: Vec<usize> = if axes.is_empty() {
        (0..rank).collect()
    } else {
        axes.iter().map(|&a| normalize_axis(a, rank)).collect()
    };
    normalized.sort_unstable();
    normalized.dedup();

    let mut data = flat.to_vec();
    let mut current_shape = shape.to_vec();
    for &axis in normalized.iter().rev() {
        let (folded, folded_shape) = fold_axis(&data, &current_shape, axis, op);
        data = folded;
        current_shape = folded_shape;
    }

    if keepdims {
        for &axis in &normalized {
            current_shape.insert(axis, 1);
        }
    }
    if current_shape.is_empty() && !keepdims && rank > 0 {
        // A fully-reduced non-scalar input yields a 0-d (scalar) result; represented as `[]`.
    }

    (data, current_shape)
}

/// For same-shape inputs, returns `(vec![], vec![])`. Otherwise computes, for each side, the axes
/// that must be reduced to un-broadcast it down to the other's shape. The comparison at index `i`
/// is intentionally one-sided (`shape_b[i] > shape_a[i]` is treated as "no reduction needed" but
/// not its mirror) — preserved verbatim from the system this evaluator reimplements rather than
/// corrected, per the documented decision to keep this quirk rather than silently fix it.
pub fn broadcast_gradient_args(shape_a: &[usize], shape_b: &[usize]) -> (Vec<i64>, Vec<i64>) {
    if shape_a == shape_b {
        return (vec![], vec![]);
    }
    (one_sided(shape_a, shape_b), one_sided(shape_b, shape_a))
}

fn one_sided(shape_a: &[usize], shape_b: &[usize]) -> Vec<i64> {
    let rank_a = shape_a.len();
    let rank_b = shape_b.len();
    (0..rank_a)
        .filter_map(|i| {
            if i >= rank_b {
                Some((rank_a - i - 1) as i64)
            } else if shape_b[i] == shape_a[i] {
                None
            } else if shape_b[i] > shape_a[i] {
                None
            } else {
                Some((rank_a - i - 1) as i64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(v: f32) -> Scalar {
        Scalar::Fp32(v)
    }

    #[test]
    fn sum_over_axis_zero_sums_rows() {
        let data = [fp(1.0), fp(2.0), fp(3.0), fp(4.0)];
        let (out, shape) = reduce(ReduceOp::Sum, &data, &[2, 2], &[0], false);
        assert_eq!(shape, vec![2]);
        assert_eq!(out, vec![fp(4.0), fp(6.0)]);
    }

    #[test]
    fn sum_over_axis_one_sums_columns() {
        let data = [fp(1.0), fp(2.0), fp(3.0), fp(4.0)];
        let (out, shape) = reduce(ReduceOp::Sum, &data, &[2, 2], &[1], false);
        assert_eq!(shape, vec![2]);
        assert_eq!(out, vec![fp(3.0), fp(7.0)]);
    }

    #[test]
    fn sum_over_all_axes_reduces_fully() {
        let data = [fp(1.0), fp(2.0), fp(3.0), fp(4.0)];
        let (out, shape) = reduce(ReduceOp::Sum, &data, &[2, 2], &[], false);
        assert!(shape.is_empty());
        assert_eq!(out, vec![fp(10.0)]);
    }

    #[test]
    fn prod_of_ones_is_one() {
        let data = vec![fp(1.0); 6];
        let (out, _) = reduce(ReduceOp::Prod, &data, &[2, 3], &[], false);
        assert_eq!(out, vec![fp(1.0)]);
    }

    #[test]
    fn keepdims_reinserts_reduced_axis() {
        let data = [fp(1.0), fp(2.0), fp(3.0), fp(4.0)];
        let (_, shape) = reduce(ReduceOp::Sum, &data, &[2, 2], &[0], true);
        assert_eq!(shape, vec![1, 2]);
    }

    #[test]
    fn same_shape_needs_no_gradient_reduction() {
        assert_eq!(broadcast_gradient_args(&[2, 3], &[2, 3]), (vec![], vec![]));
    }

    #[test]
    fn scalar_against_matrix_reduces_every_axis() {
        let (axes_a, axes_b) = broadcast_gradient_args(&[], &[2, 3]);
        assert!(axes_a.is_empty());
        assert_eq!(axes_b, vec![1, 0]);
    }
}
