//! Flattens an N-dimensional shape down to the `(M, N)` pair every kernel in the resource
//! directory is indexed by (`C[row * N + col]`, global work size `[M, N]`). Outer dimensions
//! beyond the last one are folded into `M`; a scalar (empty shape, or a shape whose product is 1)
//! becomes `(1, 1)`.

/// Returns the `(M, N)` work-size pair for `shape`.
pub fn dims2(shape: &[usize]) -> (usize, usize) {
    match shape.len() {
        0 => (1, 1),
        1 => (1, shape[0].max(1)),
        len => {
            let m = shape[..len - 1].iter().product::<usize>().max(1);
            let n = shape[len - 1].max(1);
            (m, n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_shape() {
        assert_eq!(dims2(&[]), (1, 1));
    }

    #[test]
    fn rank_one() {
        assert_eq!(dims2(&[4]), (1, 4));
    }

    #[test]
    fn rank_two() {
        assert_eq!(dims2(&[2, 3]), (2, 3));
    }

    #[test]
    fn higher_rank_folds_into_m() {
        assert_eq!(dims2(&[2, 3, 4]), (6, 4));
    }
}
