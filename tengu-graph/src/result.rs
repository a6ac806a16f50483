//! Converts between this crate's nested `HostValue` (what the evaluator's public `run` returns
//! and what constants/variables are seeded from) and the backend's flat, dtype-tagged arrays.

use tengu_backend::Dtype;
use tengu_backend_ocl::{HostArray, HostValue as BackendHostValue};

use crate::tensor::{HostValue, Scalar};

/// Flattens a nested `HostValue` into the backend's flat typed array, casting every leaf scalar
/// into `dtype`'s family.
pub fn to_backend_value(value: &HostValue, dtype: Dtype) -> BackendHostValue {
    let flat = value.flatten();
    match dtype {
        Dtype::Fp32 => BackendHostValue::Fp32(flat.iter().map(scalar_as_f32).collect()),
        Dtype::Int32 => BackendHostValue::Int32(flat.iter().map(scalar_as_i32).collect()),
        Dtype::Bool => BackendHostValue::Bool(flat.iter().map(scalar_as_bool).collect()),
    }
}

/// Rebuilds a nested `HostValue` of `shape` from a device buffer's host mirror.
pub fn from_host_array(array: &HostArray, shape: &[usize]) -> HostValue {
    let flat: Vec<Scalar> = match array {
        HostArray::Fp32(v) => v.iter().map(|&x| Scalar::Fp32(x)).collect(),
        HostArray::Int32(v) => v.iter().map(|&x| Scalar::Int32(x)).collect(),
        HostArray::Bool(v) => v.iter().map(|&x| Scalar::Bool(x != 0)).collect(),
    };
    HostValue::nest(&flat, shape)
}

/// Adopts a device buffer's host mirror directly as a backend upload value, with no scalar
/// round-trip — used when re-uploading data that is already in the target dtype's native layout
/// (e.g. the host form of an `assign` source, or a reshaped/truncated array).
pub fn host_array_to_backend_value(array: HostArray) -> BackendHostValue {
    match array {
        HostArray::Fp32(v) => BackendHostValue::Fp32(v),
        HostArray::Int32(v) => BackendHostValue::Int32(v),
        HostArray::Bool(v) => BackendHostValue::Bool(v.into_iter().map(|x| x != 0).collect()),
    }
}

/// Flattens a host array into the scalar vector `reduce`/`broadcast_transform`/etc. operate on.
pub fn flatten_host_array(array: &HostArray) -> Vec<Scalar> {
    match array {
        HostArray::Fp32(v) => v.iter().map(|&x| Scalar::Fp32(x)).collect(),
        HostArray::Int32(v) => v.iter().map(|&x| Scalar::Int32(x)).collect(),
        HostArray::Bool(v) => v.iter().map(|&x| Scalar::Bool(x != 0)).collect(),
    }
}

/// Packs a scalar vector back into a backend host value of `dtype`.
pub fn pack_backend_value(flat: &[Scalar], dtype: Dtype) -> BackendHostValue {
    match dtype {
        Dtype::Fp32 => BackendHostValue::Fp32(flat.iter().map(scalar_as_f32).collect()),
        Dtype::Int32 => BackendHostValue::Int32(flat.iter().map(scalar_as_i32).collect()),
        Dtype::Bool => BackendHostValue::Bool(flat.iter().map(scalar_as_bool).collect()),
    }
}

fn scalar_as_f32(s: &Scalar) -> f32 {
    match *s {
        Scalar::Fp32(v) => v,
        Scalar::Int32(v) => v as f32,
        Scalar::Bool(v) => v as u8 as f32,
    }
}

fn scalar_as_i32(s: &Scalar) -> i32 {
    match *s {
        Scalar::Fp32(v) => v as i32,
        Scalar::Int32(v) => v,
        Scalar::Bool(v) => v as i32,
    }
}

fn scalar_as_bool(s: &Scalar) -> bool {
    match *s {
        Scalar::Fp32(v) => v != 0.0,
        Scalar::Int32(v) => v != 0,
        Scalar::Bool(v) => v,
    }
}
