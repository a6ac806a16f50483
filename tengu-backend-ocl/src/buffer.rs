//! The device buffer: the core's handle pairing a host-side typed array, an optional device-side
//! memory object, the declared shape and dtype, a dirty flag, and the last event that wrote the
//! device memory. This is the OpenCL-concrete realization of the data model's "Device Buffer".

use tengu_backend::Dtype;

/// A host-side typed array, tagged by dtype so it can live behind a single non-generic type.
#[derive(Clone, Debug)]
pub enum HostArray {
    Fp32(Vec<f32>),
    Int32(Vec<i32>),
    /// Booleans are stored with the same width as `Int32` (`0`/`1`); OpenCL has no native bool
    /// buffer element type.
    Bool(Vec<i32>),
}

impl HostArray {
    /// Allocates a zero-filled host array of length `max(1, len)` for the given dtype.
    pub fn zeros(dtype: Dtype, len: usize) -> Self {
        let len = len.max(1);
        match dtype {
            Dtype::Fp32 => HostArray::Fp32(vec![0.0; len]),
            Dtype::Int32 => HostArray::Int32(vec![0; len]),
            Dtype::Bool => HostArray::Bool(vec![0; len]),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            HostArray::Fp32(_) => Dtype::Fp32,
            HostArray::Int32(_) => Dtype::Int32,
            HostArray::Bool(_) => Dtype::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostArray::Fp32(v) => v.len(),
            HostArray::Int32(v) => v.len(),
            HostArray::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_fp32(&self) -> Option<&[f32]> {
        match self {
            HostArray::Fp32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int32(&self) -> Option<&[i32]> {
        match self {
            HostArray::Int32(v) | HostArray::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Device-side memory, tagged by the dtype family it was allocated for. Booleans share the
/// `Int32` allocation since OpenCL kernels address them through the same 32-bit storage.
pub enum DeviceMem {
    Fp32(tengu_ocl::Buffer<f32>),
    Int32(tengu_ocl::Buffer<i32>),
}

impl DeviceMem {
    pub fn len(&self) -> usize {
        match self {
            DeviceMem::Fp32(b) => b.len(),
            DeviceMem::Int32(b) => b.len(),
        }
    }
}

/// The evaluator's core data-carrying unit: a named, shaped, dtyped buffer with a host mirror, an
/// optional device allocation, and a back-reference to the event that last wrote the device
/// memory. `last_event` is never owned by a downstream consumer; it is read once as a wait-list
/// entry and then superseded by the consumer's own completion event.
pub struct DeviceBuffer {
    name: String,
    dtype: Dtype,
    shape: Vec<usize>,
    host: HostArray,
    device: Option<DeviceMem>,
    last_event: Option<ocl::Event>,
    dirty: bool,
}

impl DeviceBuffer {
    pub fn new(name: impl Into<String>, dtype: Dtype, shape: Vec<usize>, host: HostArray, device: Option<DeviceMem>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
            host,
            device,
            last_event: None,
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn count(&self) -> usize {
        self.shape.iter().product::<usize>().max(1)
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// True if this buffer holds a single logical element (a scalar or an empty shape).
    pub fn is_scalar(&self) -> bool {
        self.count() == 1
    }

    pub fn host(&self) -> &HostArray {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HostArray {
        &mut self.host
    }

    pub fn device(&self) -> Option<&DeviceMem> {
        self.device.as_ref()
    }

    pub fn set_device(&mut self, device: Option<DeviceMem>) {
        self.device = device;
    }

    pub fn last_event(&self) -> Option<ocl::Event> {
        self.last_event.clone()
    }

    pub fn set_last_event(&mut self, event: ocl::Event) {
        self.last_event = Some(event);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Updates the declared shape without touching the underlying host or device storage. Used
    /// by `reshape`, which is a pure metadata operation: the element count must not change.
    pub fn set_shape(&mut self, shape: Vec<usize>) {
        debug_assert_eq!(
            shape.iter().product::<usize>().max(1),
            self.count(),
            "reshape must preserve element count"
        );
        self.shape = shape;
    }
}
