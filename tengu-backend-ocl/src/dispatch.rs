//! The kernel dispatcher: for a given elementwise/matmul/unary operation, selects the program
//! variant (same-shape / scalar / broadcast / transposed-matmul), packs the scalar arguments the
//! kernel expects, enqueues it, and records the output event on the result buffer. One kernel is
//! enqueued per node rather than fusing a subgraph into a single compiled program.

use std::cell::RefCell;
use std::rc::Rc;

use tengu_backend::{Dtype, Error, Kind, Result};

use crate::args::bind;
use crate::buffer::DeviceBuffer;
use crate::buffer_factory::create_result_buffer;
use crate::dims::dims2;
use crate::session::SessionCache;

/// A single scalar value to pack after `(M, N[, M2, N2], switch)` and before the buffer
/// arguments, e.g. `clip_by_value`'s `(min, max)`.
#[derive(Clone, Copy, Debug)]
pub enum Scalar {
    Fp32(f32),
    Int32(i32),
}

/// The variant a two-operand elementwise kernel is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Variant {
    Same,
    Scalar,
    Broadcast,
}

impl Variant {
    fn suffix(self) -> &'static str {
        match self {
            Variant::Same => "",
            Variant::Scalar => "_c",
            Variant::Broadcast => "_b",
        }
    }
}

/// Selects the kernel variant, the `switch` flag, and whether the caller's `(a, b)` pair must be
/// swapped to land in canonical `(A, B)` kernel-argument order.
fn select(a_shape: &[usize], b_shape: &[usize]) -> (Variant, bool, bool) {
    let a_scalar = a_shape.is_empty() || a_shape.iter().product::<usize>() <= 1;
    let b_scalar = b_shape.is_empty() || b_shape.iter().product::<usize>() <= 1;

    if a_shape == b_shape {
        return (Variant::Same, false, false);
    }
    if a_scalar {
        return (Variant::Scalar, true, true);
    }
    if b_scalar {
        return (Variant::Scalar, false, false);
    }
    if a_shape.len() < b_shape.len() {
        return (Variant::Broadcast, true, true);
    }
    if a_shape.len() == b_shape.len() {
        for (x, y) in a_shape.iter().zip(b_shape.iter()) {
            if x == y {
                continue;
            }
            return if x < y {
                (Variant::Broadcast, true, true)
            } else {
                (Variant::Broadcast, false, false)
            };
        }
        // Ranks and every axis equal but `a_shape != b_shape` cannot happen; fall through.
    }
    (Variant::Broadcast, false, false)
}

/// `_b` kernels broadcast via index modulo, which is only defined for ranks <= 2; any broadcast
/// pairing where either operand exceeds that rank must be rejected rather than silently
/// mis-indexed.
fn broadcast_rank_ok(variant: Variant, a_rank: usize, b_rank: usize) -> bool {
    variant != Variant::Broadcast || (a_rank <= 2 && b_rank <= 2)
}

/// Dispatches a two-operand elementwise kernel for `op` over `a` and `b` (already dtype-coerced
/// to a common family), writing into a result buffer of `result_shape` and the operands' common
/// dtype. Returns the result buffer with its `last_event` set to the enqueued kernel's completion
/// event.
pub fn binary(
    session: &SessionCache,
    op: &str,
    a: &Rc<RefCell<DeviceBuffer>>,
    b: &Rc<RefCell<DeviceBuffer>>,
    result_shape: &[usize],
) -> Result<Rc<RefCell<DeviceBuffer>>> {
    let (a_shape, a_dtype) = {
        let a = a.borrow();
        (a.shape().to_vec(), a.dtype())
    };
    let b_shape = b.borrow().shape().to_vec();
    let (variant, switch, swap) = select(&a_shape, &b_shape);
    if !broadcast_rank_ok(variant, a_shape.len(), b_shape.len()) {
        return Err(Error::execution(
            Kind::RankError(format!("broadcast is only defined for ranks <= 2, got {} and {}", a_shape.len(), b_shape.len())),
            op,
            None,
        ));
    }

    let (kernel_a, kernel_b) = if swap { (b, a) } else { (a, b) };
    let kernel_name = format!("{op}{}_{}", variant.suffix(), a_dtype.kernel_suffix());

    let result_name = format!("{op}({},{})", a.borrow().name(), b.borrow().name());
    let result = create_result_buffer(session, &result_name, result_shape, a_dtype)?;

    let device = session.device();
    let program = session.registry().program(device, op)?;
    let (m, n) = dims2(result_shape);

    let wait_for = {
        let ka = kernel_a.borrow();
        let kb = kernel_b.borrow();
        tengu_ocl::wait_list([ka.last_event(), kb.last_event()])
    };

    let event = {
        let ka = kernel_a.borrow();
        let kb = kernel_b.borrow();
        let result_ref = result.borrow();
        let mut builder = program.kernel(device, &kernel_name).global_work_size(m, n).arg_scalar(m as i32).arg_scalar(n as i32);
        if variant == Variant::Broadcast {
            let (m2, n2) = dims2(kb.shape());
            builder = builder.arg_scalar(m2 as i32).arg_scalar(n2 as i32);
        }
        builder = builder.arg_scalar(switch as i32);
        builder = bind(builder, ka.device().expect("operand buffer must be materialized"));
        builder = bind(builder, kb.device().expect("operand buffer must be materialized"));
        builder = bind(builder, result_ref.device().expect("result buffer must be allocated"));
        unsafe { builder.enqueue(&wait_for)? }
    };
    result.borrow_mut().set_last_event(event);
    Ok(result)
}

/// Dispatches a single-operand elementwise kernel for `op` over `a`, packing `extra_scalars`
/// after `(M, N)` and before the buffer arguments (used by `clip_by_value`'s `(min, max)`).
pub fn unary(
    session: &SessionCache,
    op: &str,
    a: &Rc<RefCell<DeviceBuffer>>,
    result_shape: &[usize],
    extra_scalars: &[Scalar],
) -> Result<Rc<RefCell<DeviceBuffer>>> {
    let (a_name, a_dtype) = {
        let a = a.borrow();
        (a.name().to_string(), a.dtype())
    };
    let kernel_name = format!("{op}_{}", a_dtype.kernel_suffix());
    let result_name = format!("{op}({a_name})");
    let result = create_result_buffer(session, &result_name, result_shape, a_dtype)?;

    let device = session.device();
    let program = session.registry().program(device, op)?;
    let (m, n) = dims2(result_shape);

    let wait_for = tengu_ocl::wait_list([a.borrow().last_event()]);
    let event = {
        let a_ref = a.borrow();
        let result_ref = result.borrow();
        let mut builder = program.kernel(device, &kernel_name).global_work_size(m, n).arg_scalar(m as i32).arg_scalar(n as i32);
        for scalar in extra_scalars {
            builder = match *scalar {
                Scalar::Fp32(v) => builder.arg_scalar(v),
                Scalar::Int32(v) => builder.arg_scalar(v),
            };
        }
        builder = bind(builder, a_ref.device().expect("operand buffer must be materialized"));
        builder = bind(builder, result_ref.device().expect("result buffer must be allocated"));
        unsafe { builder.enqueue(&wait_for)? }
    };
    result.borrow_mut().set_last_event(event);
    Ok(result)
}

/// Dispatches `gemm_{fp,int}` over `a` (logically `(m, k)`) and `b` (logically `(k, n)`),
/// optionally reading either operand transposed. Result dtype and kernel family follow `a`'s
/// (already-coerced) dtype.
#[allow(clippy::too_many_arguments)]
pub fn matmul(
    session: &SessionCache,
    a: &Rc<RefCell<DeviceBuffer>>,
    b: &Rc<RefCell<DeviceBuffer>>,
    transpose_a: bool,
    transpose_b: bool,
    m: usize,
    n: usize,
    k: usize,
) -> Result<Rc<RefCell<DeviceBuffer>>> {
    let dtype = a.borrow().dtype();
    let kernel_name = format!("gemm_{}", dtype.kernel_suffix());
    let result_name = format!("gemm({},{})", a.borrow().name(), b.borrow().name());
    let result = create_result_buffer(session, &result_name, &[m, n], dtype)?;

    let device = session.device();
    let program = session.registry().program(device, "gemm")?;

    let wait_for = tengu_ocl::wait_list([a.borrow().last_event(), b.borrow().last_event()]);
    let event = {
        let a_ref = a.borrow();
        let b_ref = b.borrow();
        let result_ref = result.borrow();
        let builder = program
            .kernel(device, &kernel_name)
            .global_work_size(m, n)
            .arg_scalar(m as i32)
            .arg_scalar(n as i32)
            .arg_scalar(k as i32)
            .arg_scalar(transpose_a as i32)
            .arg_scalar(transpose_b as i32);
        let builder = bind(builder, a_ref.device().expect("operand buffer must be materialized"));
        let builder = bind(builder, b_ref.device().expect("operand buffer must be materialized"));
        let builder = bind(builder, result_ref.device().expect("result buffer must be allocated"));
        unsafe { builder.enqueue(&wait_for)? }
    };
    result.borrow_mut().set_last_event(event);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_shape_variant() {
        assert_eq!(select(&[2, 3], &[2, 3]), (Variant::Same, false, false));
    }

    #[test]
    fn a_scalar_variant() {
        assert_eq!(select(&[], &[2, 3]), (Variant::Scalar, true, true));
    }

    #[test]
    fn b_scalar_variant() {
        assert_eq!(select(&[2, 3], &[1]), (Variant::Scalar, false, false));
    }

    #[test]
    fn lower_rank_broadcasts_with_swap() {
        assert_eq!(select(&[3], &[2, 3]), (Variant::Broadcast, true, true));
    }

    #[test]
    fn equal_rank_first_smaller_axis_swaps() {
        assert_eq!(select(&[1, 3], &[2, 3]), (Variant::Broadcast, true, true));
    }

    #[test]
    fn equal_rank_first_larger_axis_keeps_order() {
        assert_eq!(select(&[2, 3], &[1, 3]), (Variant::Broadcast, false, false));
    }

    #[test]
    fn broadcast_rejects_rank_above_two_even_when_only_one_side_exceeds_it() {
        let (variant, _, _) = select(&[2, 3, 4], &[3, 4]);
        assert_eq!(variant, Variant::Broadcast);
        assert!(!broadcast_rank_ok(variant, 3, 2));
    }

    #[test]
    fn broadcast_allows_rank_two_on_both_sides() {
        assert!(broadcast_rank_ok(Variant::Broadcast, 2, 2));
    }
}
