//! The recursive walker: `eval_node` dispatches on node variant, `eval_operation` dispatches on
//! op tag. Both memoize through `ExecutionContext` and report failures wrapped with the offending
//! node's name via `tengu_backend::Error::execution`.

use std::cell::RefCell;
use std::rc::Rc;

use tengu_backend::{Dtype, Error, Kind, Result as BResult};
use tengu_backend_ocl::{binary, coerce_pair, convert_to_opencl, copy_device_to_device, create_result_buffer, matmul, read_to_host, unary, DeviceBuffer, Scalar as KernelScalar, SessionCache};

use crate::context::{Evaluated, ExecutionContext, HistoryEntry};
use crate::ops::Op;
use crate::randomizer::{Randomizer, Seeds};
use crate::reduce::{self, ReduceOp};
use crate::result::{flatten_host_array, host_array_to_backend_value, pack_backend_value};
use crate::tensor::{Node, Operation, Scalar, Variable};
use crate::unify::Unify;

/// Evaluates `node` against `session`, memoizing operation results by name in `ctx` and honoring
/// `ctx`'s retain set (a node whose name is retained is looked up directly in the session's
/// buffer cache instead of being recomputed, provided it has been materialized there already).
pub fn eval_node(session: &SessionCache, randomizer: &Randomizer, graph_seed: Option<u64>, node: &Node, ctx: &ExecutionContext) -> BResult<Evaluated> {
    if let Some(name) = node.name() {
        if let Some(cached) = ctx.memo_get(name) {
            return Ok(cached);
        }
        if ctx.is_retained(name) {
            if let Some(buffer) = session.get_buffer(name, node.declared_shape()) {
                return Ok(Evaluated::Buffer(buffer));
            }
        }
    }

    let result = eval_node_dispatch(session, randomizer, graph_seed, node, ctx)
        .map_err(|e| e.with_node(node.name().unwrap_or("<anonymous>"), node_source(node)))?;

    if let Some(name) = node.name() {
        ctx.memo_put(name, result.clone());
    }
    Ok(result)
}

fn node_source(node: &Node) -> Option<String> {
    match node {
        Node::Tensor(t) => t.source.clone(),
        Node::Operation(o) => o.source.clone(),
        _ => None,
    }
}

fn eval_node_dispatch(session: &SessionCache, randomizer: &Randomizer, graph_seed: Option<u64>, node: &Node, ctx: &ExecutionContext) -> BResult<Evaluated> {
    Ok(match node {
        Node::Buffer(b) => Evaluated::Buffer(b.clone()),
        Node::List(items) => {
            let evaluated = items
                .iter()
                .map(|item| eval_node(session, randomizer, graph_seed, item, ctx))
                .collect::<BResult<Vec<_>>>()?;
            Evaluated::List(evaluated)
        }
        Node::Thunk(produce) => {
            let produced = produce();
            eval_node(session, randomizer, graph_seed, &produced, ctx)?
        }
        Node::Tensor(t) => {
            let value = crate::result::to_backend_value(&t.value, t.dtype);
            let buffer = convert_to_opencl(session, &t.name, &t.shape, t.dtype, Some(value))?;
            Evaluated::Buffer(buffer)
        }
        Node::Placeholder(p) => {
            let value = ctx
                .feed(&p.name)
                .ok_or_else(|| Error::execution(Kind::MissingPlaceholder(p.name.clone()), &p.name, None))?;
            let backend_value = crate::result::to_backend_value(value, p.dtype);
            let buffer = convert_to_opencl(session, &p.name, &p.shape, p.dtype, Some(backend_value))?;
            Evaluated::Buffer(buffer)
        }
        Node::Variable(v) => Evaluated::Buffer(eval_variable(session, v)?),
        Node::Operation(op) => eval_operation(session, randomizer, graph_seed, op, ctx)?,
    })
}

fn eval_variable(session: &SessionCache, v: &Rc<Variable>) -> BResult<Rc<RefCell<DeviceBuffer>>> {
    if let Some(buffer) = v.buffer.borrow().as_ref() {
        return Ok(buffer.clone());
    }
    let Some(init) = &v.init else {
        return Err(Error::execution(Kind::UninitializedVariable(v.name.clone()), &v.name, None));
    };
    let value = crate::result::to_backend_value(init, v.dtype);
    let buffer = convert_to_opencl(session, &v.name, &v.shape, v.dtype, Some(value))?;
    *v.buffer.borrow_mut() = Some(buffer.clone());
    Ok(buffer)
}

fn as_buffer(name: &str, evaluated: Evaluated) -> BResult<Rc<RefCell<DeviceBuffer>>> {
    evaluated
        .as_buffer()
        .cloned()
        .ok_or_else(|| Error::execution(Kind::ShapeMismatch("expected a single buffer, got a list".into()), name, None))
}

fn eval_child(session: &SessionCache, randomizer: &Randomizer, graph_seed: Option<u64>, node: &Node, ctx: &ExecutionContext, op_name: &str) -> BResult<Rc<RefCell<DeviceBuffer>>> {
    let evaluated = eval_node(session, randomizer, graph_seed, node, ctx)?;
    as_buffer(op_name, evaluated)
}

fn unify_shapes(op: &Operation, a: &[usize], b: &[usize]) -> BResult<Vec<usize>> {
    a.unify(b).ok_or_else(|| Error::execution(Kind::ShapeMismatch(format!("{:?} vs {:?}", a, b)), &op.name, op.source.clone()))
}

fn eval_operation(session: &SessionCache, randomizer: &Randomizer, graph_seed: Option<u64>, op: &Rc<Operation>, ctx: &ExecutionContext) -> BResult<Evaluated> {
    let result = eval_operation_inner(session, randomizer, graph_seed, op, ctx)?;
    let needs_host_value = op.breakpoint.is_some() || ctx.log_intermediates();
    let host_value = needs_host_value.then(|| evaluated_to_host_value(session, &result)).transpose()?;

    if let Some(breakpoint) = &op.breakpoint {
        let inputs = op
            .items
            .iter()
            .map(|item| host_value_of(session, randomizer, graph_seed, item, ctx))
            .collect::<BResult<Vec<_>>>()?;
        breakpoint(&op.name, &inputs, host_value.as_ref().expect("computed above"));
    }
    if ctx.log_intermediates() {
        ctx.push_history(HistoryEntry {
            name: op.name.clone(),
            dtype: op.dtype,
            shape: op.shape.clone(),
            source: op.source.clone(),
            description: op.op.as_str().to_string(),
            host_value: host_value.expect("computed above"),
        });
    }
    Ok(result)
}

fn host_value_of(session: &SessionCache, randomizer: &Randomizer, graph_seed: Option<u64>, node: &Node, ctx: &ExecutionContext) -> BResult<crate::tensor::HostValue> {
    let evaluated = eval_node(session, randomizer, graph_seed, node, ctx)?;
    evaluated_to_host_value(session, &evaluated)
}

pub(crate) fn evaluated_to_host_value(session: &SessionCache, evaluated: &Evaluated) -> BResult<crate::tensor::HostValue> {
    match evaluated {
        Evaluated::Buffer(b) => {
            let array = read_to_host(session, b)?;
            let shape = b.borrow().shape().to_vec();
            Ok(crate::result::from_host_array(&array, &shape))
        }
        Evaluated::List(items) => {
            let values = items.iter().map(|item| evaluated_to_host_value(session, item)).collect::<BResult<Vec<_>>>()?;
            Ok(crate::tensor::HostValue::Array(values))
        }
    }
}

fn eval_operation_inner(session: &SessionCache, randomizer: &Randomizer, graph_seed: Option<u64>, op: &Rc<Operation>, ctx: &ExecutionContext) -> BResult<Evaluated> {
    let name = op.name.as_str();
    let child = |i: usize| &op.items[i];
    let eval = |node: &Node| eval_child(session, randomizer, graph_seed, node, ctx, name);

    match op.op {
        Op::Identity => eval_node(session, randomizer, graph_seed, child(0), ctx),

        Op::Assign => {
            let var = expect_variable(child(0), name)?;
            let value_buf = eval(child(1))?;
            let result = assign(session, &var, &value_buf)?;
            Ok(Evaluated::Buffer(result))
        }

        Op::AssignAdd => {
            let var = expect_variable(child(0), name)?;
            let var_buf = eval_variable(session, &var)?;
            let value_buf = eval(child(1))?;
            let (a, b) = coerce_pair(session, var_buf, value_buf)?;
            let result_shape = unify_shapes(op, a.borrow().shape(), b.borrow().shape())?;
            let summed = binary(session, "add", &a, &b, &result_shape)?;
            let result = assign(session, &var, &summed)?;
            Ok(Evaluated::Buffer(result))
        }

        op_tag if op_tag.is_binary() => {
            let a = eval(child(0))?;
            let b = eval(child(1))?;
            let (a, b) = coerce_pair(session, a, b)?;
            let result_shape = unify_shapes(op, a.borrow().shape(), b.borrow().shape())?;
            let kernel = op_tag.kernel_name().expect("binary op always names a kernel");
            Ok(Evaluated::Buffer(binary(session, kernel, &a, &b, &result_shape)?))
        }

        op_tag if op_tag.is_unary() => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let kernel = op_tag.kernel_name().expect("unary op always names a kernel");
            Ok(Evaluated::Buffer(unary(session, kernel, &a, &shape, &[])?))
        }

        Op::ClipByValue => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let min = op.options.float("min").unwrap_or(0.0);
            let max = op.options.float("max").unwrap_or(1.0);
            let extra = match a.borrow().dtype() {
                Dtype::Fp32 => vec![KernelScalar::Fp32(min as f32), KernelScalar::Fp32(max as f32)],
                _ => vec![KernelScalar::Int32(min as i32), KernelScalar::Int32(max as i32)],
            };
            Ok(Evaluated::Buffer(unary(session, "clip_by_value", &a, &shape, &extra)?))
        }

        Op::MatMul => {
            let a = eval(child(0))?;
            let b = eval(child(1))?;
            let transpose_a = op.options.bool("transpose_a").unwrap_or(false);
            let transpose_b = op.options.bool("transpose_b").unwrap_or(false);
            let a_shape = a.borrow().shape().to_vec();
            let b_shape = b.borrow().shape().to_vec();
            if a_shape.len() < 2 || b_shape.len() < 2 {
                return Err(Error::execution(Kind::RankError(format!("matmul requires rank >= 2, got {} and {}", a_shape.len(), b_shape.len())), name, op.source.clone()));
            }
            let (m, k) = if transpose_a {
                (a_shape[a_shape.len() - 1], a_shape[a_shape.len() - 2])
            } else {
                (a_shape[a_shape.len() - 2], a_shape[a_shape.len() - 1])
            };
            let (v, n) = if transpose_b {
                (b_shape[b_shape.len() - 1], b_shape[b_shape.len() - 2])
            } else {
                (b_shape[b_shape.len() - 2], b_shape[b_shape.len() - 1])
            };
            if k != v {
                return Err(Error::execution(Kind::ShapeMismatch(format!("matmul inner dimensions disagree: {k} != {v}")), name, op.source.clone()));
            }
            let (a, b) = coerce_pair(session, a, b)?;
            Ok(Evaluated::Buffer(matmul(session, &a, &b, transpose_a, transpose_b, m, n, k)?))
        }

        Op::Zeros | Op::Ones | Op::ZerosLike | Op::OnesLike => {
            let fill = if matches!(op.op, Op::Ones | Op::OnesLike) { 1.0 } else { 0.0 };
            let value = constant_fill(&op.shape, op.dtype, fill);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &op.shape, op.dtype, Some(value))?))
        }

        Op::Eye => {
            let rows = op.shape.first().copied().unwrap_or(1);
            let cols = op.shape.get(1).copied().unwrap_or(rows);
            let mut flat = vec![0.0f32; rows * cols];
            for r in 0..rows.min(cols) {
                flat[r * cols + r] = 1.0;
            }
            let value = cast_fill(&flat, op.dtype);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &op.shape, op.dtype, Some(value))?))
        }

        Op::Fill => {
            let fill = op.options.float("value").unwrap_or(0.0);
            let value = constant_fill(&op.shape, op.dtype, fill);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &op.shape, op.dtype, Some(value))?))
        }

        Op::BroadcastTransform => {
            let a = eval(child(0))?;
            let b = eval(child(1))?;
            let a_shape = a.borrow().shape().to_vec();
            let b_shape = b.borrow().shape().to_vec();
            if a_shape == b_shape {
                return Ok(Evaluated::List(vec![Evaluated::Buffer(a), Evaluated::Buffer(b)]));
            }
            let target = unify_shapes(op, &a_shape, &b_shape)?;
            let a_dtype = a.borrow().dtype();
            let b_dtype = b.borrow().dtype();
            let a_flat = flatten_host_array(&read_to_host(session, &a)?);
            let b_flat = flatten_host_array(&read_to_host(session, &b)?);
            let a_expanded = broadcast_expand(&a_flat, &a_shape, &target);
            let b_expanded = broadcast_expand(&b_flat, &b_shape, &target);
            let a_out = convert_to_opencl(session, &format!("{name}/0"), &target, a_dtype, Some(pack_backend_value(&a_expanded, a_dtype)))?;
            let b_out = convert_to_opencl(session, &format!("{name}/1"), &target, b_dtype, Some(pack_backend_value(&b_expanded, b_dtype)))?;
            Ok(Evaluated::List(vec![Evaluated::Buffer(a_out), Evaluated::Buffer(b_out)]))
        }

        Op::BroadcastGradientArgs => {
            let a_shape = child(0).declared_shape().to_vec();
            let b_shape = child(1).declared_shape().to_vec();
            let (axes_a, axes_b) = reduce::broadcast_gradient_args(&a_shape, &b_shape);
            let a_out = convert_to_opencl(session, &format!("{name}/0"), &[axes_a.len()], Dtype::Int32, Some(ints_to_backend(&axes_a)))?;
            let b_out = convert_to_opencl(session, &format!("{name}/1"), &[axes_b.len()], Dtype::Int32, Some(ints_to_backend(&axes_b)))?;
            Ok(Evaluated::List(vec![Evaluated::Buffer(a_out), Evaluated::Buffer(b_out)]))
        }

        Op::Shape => {
            let shape = child(0).declared_shape().to_vec();
            let ints: Vec<i64> = shape.iter().map(|&v| v as i64).collect();
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &[ints.len()], Dtype::Int32, Some(ints_to_backend(&ints)))?))
        }

        Op::Reshape => {
            let a = eval(child(0))?;
            let new_shape_value = host_value_of(session, randomizer, graph_seed, child(1), ctx)?;
            let requested: Vec<i64> = new_shape_value.flatten().iter().map(scalar_to_i64).collect();
            let count = a.borrow().count();
            let new_shape = infer_reshape(&requested, count, name)?;
            a.borrow_mut().set_shape(new_shape);
            Ok(Evaluated::Buffer(a))
        }

        Op::RandomUniform | Op::RandomNormal | Op::GlorotUniform => {
            let seeds = Seeds {
                graph_seed,
                op_seed: op.options.int("seed").map(|s| s as u64),
            };
            let flat = randomizer.with_rng(seeds, op.op.as_str(), |rng| generate_random(op.op, &op.shape, &op.options, rng));
            let value = cast_fill(&flat, op.dtype);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &op.shape, op.dtype, Some(value))?))
        }

        Op::FlowGroup => {
            let evaluated = op
                .items
                .iter()
                .map(|item| eval_node(session, randomizer, graph_seed, item, ctx))
                .collect::<BResult<Vec<_>>>()?;
            Ok(Evaluated::List(evaluated))
        }

        Op::Sum | Op::Prod => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let dtype = a.borrow().dtype();
            let axes = reduce_axes(&op.options);
            let keepdims = op.options.bool("keepdims").unwrap_or(false);
            let flat = flatten_host_array(&read_to_host(session, &a)?);
            let reduce_op = if matches!(op.op, Op::Sum) { ReduceOp::Sum } else { ReduceOp::Prod };
            let (out, out_shape) = reduce::reduce(reduce_op, &flat, &shape, &axes, keepdims);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &out_shape, dtype, Some(pack_backend_value(&out, dtype)))?))
        }

        Op::Mean => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let axes = reduce_axes(&op.options);
            let keepdims = op.options.bool("keepdims").unwrap_or(false);
            let flat = flatten_host_array(&read_to_host(session, &a)?);
            let (out, out_shape) = reduce::reduce(ReduceOp::Sum, &flat, &shape, &axes, keepdims);
            let divisor = if axes.is_empty() {
                shape.iter().product::<usize>().max(1) as f32
            } else {
                axes.iter().map(|&ax| shape[normalize(ax, shape.len())]).product::<usize>().max(1) as f32
            };
            let out: Vec<Scalar> = out.iter().map(|s| Scalar::Fp32(scalar_to_f32(s) / divisor)).collect();
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &out_shape, Dtype::Fp32, Some(pack_backend_value(&out, Dtype::Fp32)))?))
        }

        Op::ArgMin | Op::ArgMax => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let axis = normalize(op.options.int("axis").unwrap_or(0), shape.len());
            let flat = flatten_host_array(&read_to_host(session, &a)?);
            let (out, out_shape) = arg_extremum(&flat, &shape, axis, matches!(op.op, Op::ArgMax));
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &out_shape, Dtype::Int32, Some(ints_to_backend(&out)))?))
        }

        Op::Index => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let idx_value = host_value_of(session, randomizer, graph_seed, child(1), ctx)?;
            let i = idx_value.flatten().first().map(scalar_to_i64).unwrap_or(0) as usize;
            let dtype = a.borrow().dtype();
            let flat = flatten_host_array(&read_to_host(session, &a)?);
            let (out, out_shape) = index_select(&flat, &shape, i);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &out_shape, dtype, Some(pack_backend_value(&out, dtype)))?))
        }

        Op::Truncate => {
            let a = eval(child(0))?;
            let target_value = host_value_of(session, randomizer, graph_seed, child(1), ctx)?;
            let target_shape: Vec<usize> = target_value.flatten().iter().map(|s| scalar_to_i64(s) as usize).collect();
            if a.borrow().shape() == target_shape.as_slice() {
                return Ok(Evaluated::Buffer(a));
            }
            let dtype = a.borrow().dtype();
            let flat = flatten_host_array(&read_to_host(session, &a)?);
            let count: usize = target_shape.iter().product::<usize>().max(1);
            let out: Vec<Scalar> = flat.into_iter().take(count).collect();
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &target_shape, dtype, Some(pack_backend_value(&out, dtype)))?))
        }

        Op::Pad => {
            let a = eval(child(0))?;
            let shape = a.borrow().shape().to_vec();
            let dtype = a.borrow().dtype();
            let paddings = op.options.pairs("paddings").unwrap_or(&[]).to_vec();
            let constant_value = op.options.float("constant_value").unwrap_or(0.0);
            let flat = flatten_host_array(&read_to_host(session, &a)?);
            let (out, out_shape) = pad(&flat, &shape, &paddings, scalar_from_f32(constant_value, dtype));
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &out_shape, dtype, Some(pack_backend_value(&out, dtype)))?))
        }

        Op::Concat => {
            let axis = op.options.int("axis").unwrap_or(0);
            let buffers = op.items.iter().map(|item| eval_child(session, randomizer, graph_seed, item, ctx, name)).collect::<BResult<Vec<_>>>()?;
            let dtype = buffers.first().map(|b| b.borrow().dtype()).unwrap_or(Dtype::Fp32);
            let shapes: Vec<Vec<usize>> = buffers.iter().map(|b| b.borrow().shape().to_vec()).collect();
            let axis = normalize(axis, shapes.first().map(|s| s.len()).unwrap_or(1));
            for pair in shapes.windows(2) {
                if !shapes_match_except_axis(&pair[0], &pair[1], axis) {
                    return Err(Error::execution(Kind::ShapeMismatch(format!("concat: incompatible shapes {:?} and {:?}", pair[0], pair[1])), name, op.source.clone()));
                }
            }
            let flats = buffers
                .iter()
                .map(|b| flatten_host_array(&read_to_host(session, b)?))
                .collect::<BResult<Vec<_>>>()?;
            let (out, out_shape) = concat(&flats, &shapes, axis);
            Ok(Evaluated::Buffer(convert_to_opencl(session, name, &out_shape, dtype, Some(pack_backend_value(&out, dtype)))?))
        }
    }
}

fn expect_variable(node: &Node, op_name: &str) -> BResult<Rc<Variable>> {
    match node {
        Node::Variable(v) => Ok(v.clone()),
        _ => Err(Error::execution(Kind::ShapeMismatch("assign target is not a variable".into()), op_name, None)),
    }
}

fn assign(session: &SessionCache, var: &Rc<Variable>, value: &Rc<RefCell<DeviceBuffer>>) -> BResult<Rc<RefCell<DeviceBuffer>>> {
    let existing = var.buffer.borrow().clone();
    let buffer = match existing {
        Some(existing) => {
            let event = copy_device_to_device(session, value, &existing)?;
            existing.borrow_mut().set_last_event(event);
            existing
        }
        None => {
            let host = read_to_host(session, value)?;
            let backend_value = host_array_to_backend_value(host);
            convert_to_opencl(session, &var.name, &var.shape, var.dtype, Some(backend_value))?
        }
    };
    buffer.borrow_mut().mark_dirty();
    *var.buffer.borrow_mut() = Some(buffer.clone());
    Ok(buffer)
}

fn constant_fill(shape: &[usize], dtype: Dtype, value: f64) -> tengu_backend_ocl::HostValue {
    let count = shape.iter().product::<usize>().max(1);
    match dtype {
        Dtype::Fp32 => tengu_backend_ocl::HostValue::Fp32(vec![value as f32; count]),
        Dtype::Int32 => tengu_backend_ocl::HostValue::Int32(vec![value as i32; count]),
        Dtype::Bool => tengu_backend_ocl::HostValue::Bool(vec![value != 0.0; count]),
    }
}

fn cast_fill(flat: &[f32], dtype: Dtype) -> tengu_backend_ocl::HostValue {
    match dtype {
        Dtype::Fp32 => tengu_backend_ocl::HostValue::Fp32(flat.to_vec()),
        Dtype::Int32 => tengu_backend_ocl::HostValue::Int32(flat.iter().map(|&v| v as i32).collect()),
        Dtype::Bool => tengu_backend_ocl::HostValue::Bool(flat.iter().map(|&v| v != 0.0).collect()),
    }
}

fn ints_to_backend(values: &[i64]) -> tengu_backend_ocl::HostValue {
    tengu_backend_ocl::HostValue::Int32(values.iter().map(|&v| v as i32).collect())
}

fn scalar_to_i64(s: &Scalar) -> i64 {
    match *s {
        Scalar::Fp32(v) => v as i64,
        Scalar::Int32(v) => v as i64,
        Scalar::Bool(v) => v as i64,
    }
}

fn scalar_to_f32(s: &Scalar) -> f32 {
    match *s {
        Scalar::Fp32(v) => v,
        Scalar::Int32(v) => v as f32,
        Scalar::Bool(v) => v as u8 as f32,
    }
}

fn scalar_from_f32(v: f64, dtype: Dtype) -> Scalar {
    match dtype {
        Dtype::Fp32 => Scalar::Fp32(v as f32),
        Dtype::Int32 => Scalar::Int32(v as i32),
        Dtype::Bool => Scalar::Bool(v != 0.0),
    }
}

fn normalize(axis: i64, rank: usize) -> usize {
    if axis < 0 {
        (rank as i64 + axis) as usize
    } else {
        axis as usize
    }
}

fn reduce_axes(options: &crate::tensor::Options) -> Vec<i64> {
    if let Some(axes) = options.ints("axes") {
        return axes.to_vec();
    }
    if let Some(axis) = options.int("axis") {
        return vec![axis];
    }
    Vec::new()
}

/// Infers a `-1` entry in a requested reshape from the total element count; at most one `-1` is
/// expected, matching the contract this mirrors.
fn infer_reshape(requested: &[i64], count: usize, op_name: &str) -> BResult<Vec<usize>> {
    let known_product: i64 = requested.iter().filter(|&&v| v != -1).product();
    let mut out = Vec::with_capacity(requested.len());
    for &v in requested {
        if v == -1 {
            if known_product == 0 {
                return Err(Error::execution(Kind::ShapeMismatch("reshape cannot infer -1 against a zero-sized shape".into()), op_name, None));
            }
            out.push((count as i64 / known_product) as usize);
        } else {
            out.push(v as usize);
        }
    }
    Ok(out)
}

/// Expands `flat` (laid out per `shape`, right-aligned against `target`) to `target`'s element
/// count by repeating along every broadcast axis.
fn broadcast_expand(flat: &[Scalar], shape: &[usize], target: &[usize]) -> Vec<Scalar> {
    let rank = target.len();
    let offset = rank - shape.len();
    let padded_shape: Vec<usize> = std::iter::repeat(1).take(offset).chain(shape.iter().copied()).collect();
    let strides = row_major_strides(&padded_shape);
    let total: usize = target.iter().product::<usize>().max(1);
    (0..total)
        .map(|flat_idx| {
            let coords = unravel(flat_idx, target);
            let src_idx: usize = coords
                .iter()
                .zip(padded_shape.iter())
                .zip(strides.iter())
                .map(|((&c, &dim), &stride)| if dim == 1 { 0 } else { c * stride })
                .sum();
            flat[src_idx]
        })
        .collect()
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1].max(1);
    }
    strides
}

fn unravel(mut flat_idx: usize, shape: &[usize]) -> Vec<usize> {
    let strides = row_major_strides(shape);
    strides
        .iter()
        .map(|&stride| {
            let c = flat_idx / stride.max(1);
            flat_idx %= stride.max(1);
            c
        })
        .collect()
}

fn arg_extremum(flat: &[Scalar], shape: &[usize], axis: usize, want_max: bool) -> (Vec<i64>, Vec<usize>) {
    let outer: usize = shape[..axis].iter().product::<usize>().max(1);
    let axis_len = shape[axis].max(1);
    let inner: usize = shape[axis + 1..].iter().product::<usize>().max(1);

    let mut out = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        for i in 0..inner {
            let mut best_idx = 0i64;
            let mut best_val = scalar_to_f32(&flat[o * axis_len * inner + i]);
            for a in 1..axis_len {
                let v = scalar_to_f32(&flat[o * axis_len * inner + a * inner + i]);
                let better = if want_max { v > best_val } else { v < best_val };
                if better {
                    best_val = v;
                    best_idx = a as i64;
                }
            }
            out.push(best_idx);
        }
    }
    let mut out_shape = shape.to_vec();
    out_shape.remove(axis);
    (out, out_shape)
}

fn index_select(flat: &[Scalar], shape: &[usize], i: usize) -> (Vec<Scalar>, Vec<usize>) {
    let inner: usize = shape[1..].iter().product::<usize>().max(1);
    let start = i * inner;
    let out = flat[start..start + inner].to_vec();
    (out, shape[1..].to_vec())
}

fn pad(flat: &[Scalar], shape: &[usize], paddings: &[(i64, i64)], fill: Scalar) -> (Vec<Scalar>, Vec<usize>) {
    let rank = shape.len();
    let padded_shape: Vec<usize> = (0..rank)
        .map(|i| {
            let (before, after) = paddings.get(i).copied().unwrap_or((0, 0));
            (shape[i] as i64 + before + after).max(0) as usize
        })
        .collect();
    let total: usize = padded_shape.iter().product::<usize>().max(1);
    let src_strides = row_major_strides(shape);
    let mut out = vec![fill; total];
    let count: usize = shape.iter().product::<usize>().max(1);
    for idx in 0..count {
        let coords = unravel(idx, shape);
        let padded_coords: Vec<usize> = coords
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let before = paddings.get(i).map(|&(b, _)| b).unwrap_or(0);
                (c as i64 + before) as usize
            })
            .collect();
        let dst_strides = row_major_strides(&padded_shape);
        let dst_idx: usize = padded_coords.iter().zip(dst_strides.iter()).map(|(&c, &s)| c * s).sum();
        let src_idx: usize = coords.iter().zip(src_strides.iter()).map(|(&c, &s)| c * s).sum();
        out[dst_idx] = flat[src_idx];
    }
    (out, padded_shape)
}

fn shapes_match_except_axis(a: &[usize], b: &[usize], axis: usize) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).enumerate().all(|(i, (x, y))| i == axis || x == y)
}

fn concat(flats: &[Vec<Scalar>], shapes: &[Vec<usize>], axis: usize) -> (Vec<Scalar>, Vec<usize>) {
    let rank = shapes[0].len();
    let mut out_shape = shapes[0].clone();
    out_shape[axis] = shapes.iter().map(|s| s[axis]).sum();

    let outer: usize = out_shape[..axis].iter().product::<usize>().max(1);
    let inner: usize = out_shape[axis + 1..].iter().product::<usize>().max(1);
    let mut out = Vec::with_capacity(out_shape.iter().product::<usize>().max(1));
    for o in 0..outer {
        for (flat, shape) in flats.iter().zip(shapes.iter()) {
            let axis_len = shape[axis];
            let start = o * axis_len * inner;
            out.extend_from_slice(&flat[start..start + axis_len * inner]);
        }
    }
    let _ = rank;
    (out, out_shape)
}

fn generate_random(op: Op, shape: &[usize], options: &crate::tensor::Options, rng: &mut rand::rngs::StdRng) -> Vec<f32> {
    use rand::Rng;
    use rand_distr::{Distribution, Normal};

    let count = shape.iter().product::<usize>().max(1);
    match op {
        Op::RandomUniform => {
            let min = options.float("minval").unwrap_or(0.0) as f32;
            let max = options.float("maxval").unwrap_or(1.0) as f32;
            (0..count).map(|_| rng.gen_range(min..=max)).collect()
        }
        Op::RandomNormal => {
            let mean = options.float("mean").unwrap_or(0.0);
            let stddev = options.float("stddev").unwrap_or(1.0);
            let dist = Normal::new(mean, stddev).expect("stddev must be positive");
            (0..count).map(|_| dist.sample(rng) as f32).collect()
        }
        Op::GlorotUniform => {
            let (fan_in, fan_out) = glorot_fans(shape);
            let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
            (0..count).map(|_| rng.gen_range(-limit..=limit)).collect()
        }
        _ => unreachable!("generate_random only called for random ops"),
    }
}

fn glorot_fans(shape: &[usize]) -> (usize, usize) {
    match shape.len() {
        0 => (1, 1),
        1 => (1, shape[0]),
        n => (shape[0], shape[n - 1]),
    }
}
