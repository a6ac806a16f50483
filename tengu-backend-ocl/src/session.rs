//! The session-scoped cache the backend maintains across evaluator runs: the device/context/
//! queue, the compiled kernel cache, and the buffer cache keyed by `(tensor name, shape)`. Every
//! slot here has a concrete type and is threaded explicitly through the dispatcher and buffer
//! factory rather than reached for through a shared mutable map.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::buffer::DeviceBuffer;
use crate::registry::{KernelRegistry, DEFAULT_KERNEL_DIR};

type BufferKey = (String, Vec<usize>);

pub struct SessionCache {
    device: tengu_ocl::Device,
    registry: KernelRegistry,
    buffers: RefCell<HashMap<BufferKey, Rc<RefCell<DeviceBuffer>>>>,
    result_buffers: RefCell<HashMap<BufferKey, Rc<RefCell<DeviceBuffer>>>>,
}

impl SessionCache {
    pub fn new(device: tengu_ocl::Device) -> Self {
        Self::with_kernel_dir(device, DEFAULT_KERNEL_DIR)
    }

    pub fn with_kernel_dir(device: tengu_ocl::Device, kernel_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            device,
            registry: KernelRegistry::new(kernel_dir),
            buffers: RefCell::new(HashMap::new()),
            result_buffers: RefCell::new(HashMap::new()),
        }
    }

    pub fn device(&self) -> &tengu_ocl::Device {
        &self.device
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    /// Looks up a previously materialized buffer by `(name, shape)`, if present.
    pub fn get_buffer(&self, name: &str, shape: &[usize]) -> Option<Rc<RefCell<DeviceBuffer>>> {
        self.buffers.borrow().get(&(name.to_string(), shape.to_vec())).cloned()
    }

    /// Inserts or replaces the cached buffer for `(name, shape)`.
    pub fn put_buffer(&self, name: &str, shape: &[usize], buffer: Rc<RefCell<DeviceBuffer>>) {
        self.buffers.borrow_mut().insert((name.to_string(), shape.to_vec()), buffer);
    }

    /// Looks up a previously allocated result buffer by `(name, shape)`, if present.
    pub fn get_result_buffer(&self, name: &str, shape: &[usize]) -> Option<Rc<RefCell<DeviceBuffer>>> {
        self.result_buffers.borrow().get(&(name.to_string(), shape.to_vec())).cloned()
    }

    /// Inserts or replaces the cached result buffer for `(name, shape)`.
    pub fn put_result_buffer(&self, name: &str, shape: &[usize], buffer: Rc<RefCell<DeviceBuffer>>) {
        self.result_buffers
            .borrow_mut()
            .insert((name.to_string(), shape.to_vec()), buffer);
    }
}
