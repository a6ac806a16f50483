//! The concrete OpenCL `Backend` implementation: the session-scoped cache (device, context,
//! queue, compiled kernel cache, buffer cache), the kernel registry, the buffer factory/
//! converter, the kernel dispatcher's variant-selection table, and type coercion. Consumed by the
//! `tengu-graph` evaluator, which is generic over `tengu_backend::Backend`.
//!
//! ## Modules
//!
//! - `session`: `SessionCache`, owning the device/context/queue plus the kernel and buffer caches.
//! - `registry`: lazy, cached compilation of `<op>.cl` kernel sources.
//! - `buffer`: `DeviceBuffer`/`HostArray`/`DeviceMem`, the core's tagged buffer handle.
//! - `buffer_factory`: allocates, fills, and uploads buffers from host values.
//! - `dispatch`: selects a kernel variant, packs scalar arguments, enqueues, and records events.
//! - `coerce`: promotes mismatched binary operand dtypes via a cast kernel.
//! - `dims`: flattens an N-dimensional shape to the `(M, N)` pair every kernel indexes by.
//! - `args`: binds a type-erased `DeviceMem` as a kernel buffer argument.
//! - `readout`: reads a device buffer's memory back into its host mirror.

mod args;
mod buffer;
mod buffer_factory;
mod coerce;
mod dims;
mod dispatch;
mod readout;
mod registry;
mod session;

use std::rc::Rc;

use tengu_backend::{Backend, Result};

pub use buffer::{DeviceBuffer, DeviceMem, HostArray};
pub use buffer_factory::{convert_to_opencl, copy_device_to_device, create_result_buffer, HostValue};
pub use coerce::coerce_pair;
pub use dims::dims2;
pub use dispatch::{binary, matmul, unary, Scalar};
pub use readout::read_to_host;
pub use registry::{KernelRegistry, DEFAULT_KERNEL_DIR};
pub use session::SessionCache;

/// The OpenCL backend. Owns a `SessionCache` bundling the device/context/queue, the compiled
/// kernel cache, and the buffer cache; constructed once per evaluation session and reused across
/// `run` calls.
pub struct OclBackend {
    session: SessionCache,
}

impl OclBackend {
    /// Builds a backend whose kernel registry reads `.cl` sources from `kernel_dir` instead of
    /// the default `kernels/` directory.
    pub async fn with_kernel_dir(kernel_dir: impl Into<std::path::PathBuf>) -> Result<Rc<Self>> {
        let device = tengu_ocl::Device::default_device()?;
        let session = SessionCache::with_kernel_dir(device, kernel_dir);
        Ok(Rc::new(Self { session }))
    }
}

impl Backend for OclBackend {
    type SessionCache = SessionCache;

    async fn new() -> Result<Rc<Self>> {
        let device = tengu_ocl::Device::default_device()?;
        let session = SessionCache::new(device);
        Ok(Rc::new(Self { session }))
    }

    fn session_cache(&self) -> &Self::SessionCache {
        &self.session
    }

    fn finish(&self) -> Result<()> {
        self.session.device().finish()?;
        Ok(())
    }
}
