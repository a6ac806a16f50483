//! This module provides functionality for creating and managing devices in the OpenCL backend.
//! A `Device` in this crate bundles the platform-level `ocl::Device` together with the `ocl::Context`
//! and `ocl::Queue` that are derived from it, mirroring the way a WGPU device bundles a logical GPU
//! connection with its queue.
//!
//! ## Module Structs and Methods
//!
//! - `Device`: wraps an OpenCL device, context, and command queue.
//!   - `Device::new`: builds a `Device` from an explicit platform/device pair.
//!   - `Device::default`: selects the default platform and its first device.
//!   - `Device::buffer`: creates a buffer builder for creating device buffers.
//!   - `Device::program`: creates a program builder for compiling kernel sources.
//!   - `Device::queue`: returns the underlying command queue.
//!   - `Device::finish`: blocks until every previously enqueued command has completed.

use std::ops::Deref;

use crate::buffer::BufferBuilder;
use crate::program::ProgramBuilder;
use crate::{Error, Result};

/// Represents an OpenCL device bound to a context and command queue.
pub struct Device {
    device: ocl::Device,
    context: ocl::Context,
    queue: ocl::Queue,
}

impl Device {
    /// Builds a `Device` from an explicit platform and device.
    ///
    /// # Parameters
    /// - `platform`: the OpenCL platform to use.
    /// - `device`: the OpenCL device to bind the context and queue to.
    pub fn new(platform: ocl::Platform, device: ocl::Device) -> Result<Self> {
        let context = ocl::Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(|e| Error::ContextError(e.into()))?;
        let queue = ocl::Queue::new(&context, device, None).map_err(|e| Error::QueueError(e.into()))?;
        tracing::trace!("Created OpenCL device on platform '{}'", platform.name().unwrap_or_default());
        Ok(Self { device, context, queue })
    }

    /// Selects the default platform and its first device.
    ///
    /// Honors the `TENGU_OCL_PLATFORM_INDEX`/`TENGU_OCL_DEVICE_INDEX` environment variables when
    /// set, falling back to `Platform::default()`/`Device::first` otherwise.
    pub fn default_device() -> Result<Self> {
        let platforms = ocl::Platform::list();
        let platform_idx = std::env::var("TENGU_OCL_PLATFORM_INDEX")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let platform = platforms.into_iter().nth(platform_idx).ok_or(Error::NoPlatform)?;

        let devices = ocl::Device::list_all(platform).map_err(Error::OclError)?;
        let device_idx = std::env::var("TENGU_OCL_DEVICE_INDEX")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let device = devices.into_iter().nth(device_idx).ok_or(Error::NoDevice)?;

        Self::new(platform, device)
    }

    /// Returns the underlying OpenCL context.
    pub fn context(&self) -> &ocl::Context {
        &self.context
    }

    /// Returns the underlying command queue.
    pub fn queue(&self) -> &ocl::Queue {
        &self.queue
    }

    /// Creates a new buffer builder for the specified element type.
    pub fn buffer<T: ocl::OclPrm>(&self) -> BufferBuilder<T> {
        BufferBuilder::new(self)
    }

    /// Creates a new program builder to compile a kernel source string.
    pub fn program(&self) -> ProgramBuilder {
        ProgramBuilder::new(self)
    }

    /// Blocks until every command enqueued on this device's queue has completed.
    pub fn finish(&self) -> Result<()> {
        self.queue.finish().map_err(Error::OclError)
    }
}

impl Deref for Device {
    type Target = ocl::Device;
    fn deref(&self) -> &Self::Target {
        &self.device
    }
}
