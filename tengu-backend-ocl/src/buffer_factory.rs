//! Buffer Factory / Converter: allocates, fills, and uploads device buffers from host values,
//! caching every materialized buffer by `(tensor name, shape)` in the session cache.

use std::cell::RefCell;
use std::rc::Rc;

use tengu_backend::{Dtype, Result};

use crate::buffer::{DeviceBuffer, DeviceMem, HostArray};
use crate::session::SessionCache;

/// A host-side value to seed a buffer with. Mirrors the evaluator's "nested sequence, typed
/// array, or scalar" input shapes, flattened to the target dtype by the caller.
#[derive(Clone, Debug)]
pub enum HostValue {
    Fp32(Vec<f32>),
    Int32(Vec<i32>),
    Bool(Vec<bool>),
}

impl HostValue {
    fn into_host_array(self) -> HostArray {
        match self {
            HostValue::Fp32(v) => HostArray::Fp32(v),
            HostValue::Int32(v) => HostArray::Int32(v),
            HostValue::Bool(v) => HostArray::Bool(v.into_iter().map(|b| b as i32).collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            HostValue::Fp32(v) => v.is_empty(),
            HostValue::Int32(v) => v.is_empty(),
            HostValue::Bool(v) => v.is_empty(),
        }
    }
}

/// Materializes (or re-fills) a device buffer for `(name, shape)`. If a buffer is already cached
/// under that key and `value` is non-empty, the cached buffer is re-filled and a fresh
/// host-to-device write is enqueued; otherwise the cached object is returned untouched. On a
/// cache miss, a fresh buffer is allocated from `value` (or zero-filled if `value` is `None`).
pub fn convert_to_opencl(
    session: &SessionCache,
    name: &str,
    shape: &[usize],
    dtype: Dtype,
    value: Option<HostValue>,
) -> Result<Rc<RefCell<DeviceBuffer>>> {
    let count = shape.iter().product::<usize>();

    if let Some(cached) = session.get_buffer(name, shape) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            fill_and_write(session, &cached, value)?;
        }
        return Ok(cached);
    }

    let device = session.device();
    let (host, device_mem) = match &value {
        Some(value) if !value.is_empty() => {
            let host = value.clone().into_host_array();
            let device_mem = upload(device, &host)?;
            (host, device_mem)
        }
        _ => {
            let host = HostArray::zeros(dtype, count);
            let device_mem = if count == 0 { None } else { allocate_empty(device, dtype, count)? };
            (host, device_mem)
        }
    };

    let buffer = Rc::new(RefCell::new(DeviceBuffer::new(name, dtype, shape.to_vec(), host, device_mem)));
    session.put_buffer(name, shape, buffer.clone());
    Ok(buffer)
}

/// Allocates a fresh, unwritten result buffer cached under `("_result_", name, shape)`.
pub fn create_result_buffer(session: &SessionCache, name: &str, shape: &[usize], dtype: Dtype) -> Result<Rc<RefCell<DeviceBuffer>>> {
    let key_name = format!("_result_{name}");
    if let Some(cached) = session.get_result_buffer(&key_name, shape) {
        return Ok(cached);
    }
    let count = shape.iter().product::<usize>();
    let host = HostArray::zeros(dtype, count);
    let device_mem = if count == 0 { None } else { allocate_empty(session.device(), dtype, count)? };
    let buffer = Rc::new(RefCell::new(DeviceBuffer::new(
        key_name.clone(),
        dtype,
        shape.to_vec(),
        host,
        device_mem,
    )));
    session.put_result_buffer(&key_name, shape, buffer.clone());
    Ok(buffer)
}

fn fill_and_write(session: &SessionCache, buffer: &Rc<RefCell<DeviceBuffer>>, value: HostValue) -> Result<()> {
    let mut buffer = buffer.borrow_mut();
    *buffer.host_mut() = value.into_host_array();
    let event = write_host_to_device(session.device(), buffer.host(), buffer.device())?;
    buffer.set_last_event(event);
    Ok(())
}

fn upload(device: &tengu_ocl::Device, host: &HostArray) -> Result<Option<DeviceMem>> {
    let mem = match host {
        HostArray::Fp32(v) => DeviceMem::Fp32(device.buffer::<f32>().with_data(v)?),
        HostArray::Int32(v) | HostArray::Bool(v) => DeviceMem::Int32(device.buffer::<i32>().with_data(v)?),
    };
    Ok(Some(mem))
}

fn allocate_empty(device: &tengu_ocl::Device, dtype: Dtype, count: usize) -> Result<Option<DeviceMem>> {
    let mem = match dtype {
        Dtype::Fp32 => DeviceMem::Fp32(device.buffer::<f32>().empty(count)?),
        Dtype::Int32 | Dtype::Bool => DeviceMem::Int32(device.buffer::<i32>().empty(count)?),
    };
    Ok(Some(mem))
}

fn write_host_to_device(device: &tengu_ocl::Device, host: &HostArray, device_mem: Option<&DeviceMem>) -> Result<ocl::Event> {
    let wait_for = ocl::EventList::new();
    match (host, device_mem) {
        (HostArray::Fp32(v), Some(DeviceMem::Fp32(buf))) => Ok(buf.write(device.queue(), v, &wait_for)?),
        (HostArray::Int32(v) | HostArray::Bool(v), Some(DeviceMem::Int32(buf))) => Ok(buf.write(device.queue(), v, &wait_for)?),
        _ => Err(anyhow::anyhow!("device memory dtype does not match host array dtype").into()),
    }
}

/// Enqueues a device-to-device copy of `src` into `dst`, used by `assign` to overwrite a
/// variable's existing buffer in place. Both buffers must already share dtype and element count;
/// the caller is expected to have checked this (the evaluator surfaces a `ShapeMismatch` instead
/// of reaching this function when they don't).
pub fn copy_device_to_device(session: &SessionCache, src: &Rc<RefCell<DeviceBuffer>>, dst: &Rc<RefCell<DeviceBuffer>>) -> Result<ocl::Event> {
    let wait_for = {
        let src = src.borrow();
        let dst = dst.borrow();
        tengu_ocl::wait_list([src.last_event(), dst.last_event()])
    };
    let src = src.borrow();
    let dst = dst.borrow();
    let device = session.device();
    match (src.device(), dst.device()) {
        (Some(DeviceMem::Fp32(s)), Some(DeviceMem::Fp32(d))) => Ok(s.copy_to(device.queue(), d, &wait_for)?),
        (Some(DeviceMem::Int32(s)), Some(DeviceMem::Int32(d))) => Ok(s.copy_to(device.queue(), d, &wait_for)?),
        _ => Err(anyhow::anyhow!("device-to-device copy requires matching dtypes and materialized device memory").into()),
    }
}
