//! This module provides functionality for creating and managing device buffers in the OpenCL
//! backend. It includes the `Buffer` wrapper and the `BufferBuilder` used to construct it.
//!
//! ## Buffers in OpenCL
//!
//! Buffers hold data that can be read and written by kernels. Unlike WGPU, OpenCL buffers do not
//! carry a static usage flag baked into the type signature; instead memory flags are passed at
//! creation time. This module keeps the same builder ergonomics the WGPU wrapper crate offered
//! (`with_label`, `with_data`, `empty`) on top of `ocl::Buffer<T>`.

use std::ops::Deref;

use crate::Device;
use crate::{Error, Result};

/// Represents a device buffer in the OpenCL backend.
pub struct Buffer<T: ocl::OclPrm> {
    buffer: ocl::Buffer<T>,
}

impl<T: ocl::OclPrm> Buffer<T> {
    fn new(buffer: ocl::Buffer<T>) -> Self {
        Self { buffer }
    }

    /// Enqueues a host-to-device write of `data` into this buffer and returns the completion event.
    pub fn write(&self, queue: &ocl::Queue, data: &[T], wait_for: &ocl::EventList) -> Result<ocl::Event> {
        let mut event = ocl::Event::empty();
        self.buffer
            .cmd()
            .queue(queue)
            .write(data)
            .ewait(wait_for)
            .enew(&mut event)
            .enq()
            .map_err(Error::OclError)?;
        Ok(event)
    }

    /// Enqueues a device-to-host read from this buffer into `data`, waiting on the queue to finish.
    pub fn read(&self, queue: &ocl::Queue, data: &mut [T], wait_for: &ocl::EventList) -> Result<()> {
        self.buffer
            .cmd()
            .queue(queue)
            .read(data)
            .ewait(wait_for)
            .enq()
            .map_err(Error::OclError)?;
        queue.finish().map_err(Error::OclError)
    }

    /// Enqueues a device-to-device copy from this buffer into `destination`.
    pub fn copy_to(&self, queue: &ocl::Queue, destination: &Buffer<T>, wait_for: &ocl::EventList) -> Result<ocl::Event> {
        let mut event = ocl::Event::empty();
        self.buffer
            .cmd()
            .copy(&destination.buffer, None, None)
            .queue(queue)
            .ewait(wait_for)
            .enew(&mut event)
            .enq()
            .map_err(Error::OclError)?;
        Ok(event)
    }

    /// Returns the number of elements this buffer holds.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }
}

impl<T: ocl::OclPrm> Deref for Buffer<T> {
    type Target = ocl::Buffer<T>;
    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

// NOTE: BufferBuilder implementation

/// Builder for creating and configuring a device buffer.
pub struct BufferBuilder<'device, T: ocl::OclPrm> {
    device: &'device Device,
    flags: ocl::flags::MemFlags,
    _marker: std::marker::PhantomData<T>,
}

impl<'device, T: ocl::OclPrm> BufferBuilder<'device, T> {
    /// Creates a new `BufferBuilder` instance for the given device.
    pub fn new(device: &'device Device) -> Self {
        Self {
            device,
            flags: ocl::flags::MEM_READ_WRITE,
            _marker: std::marker::PhantomData,
        }
    }

    /// Restricts this buffer to read-only access from kernels.
    pub fn read_only(mut self) -> Self {
        self.flags = ocl::flags::MEM_READ_ONLY;
        self
    }

    /// Restricts this buffer to write-only access from kernels.
    pub fn write_only(mut self) -> Self {
        self.flags = ocl::flags::MEM_WRITE_ONLY;
        self
    }

    /// Creates an empty buffer of the given length (number of elements, not bytes).
    pub fn empty(self, len: usize) -> Result<Buffer<T>> {
        let len = len.max(1);
        let buffer = ocl::Buffer::<T>::builder()
            .queue(self.device.queue().clone())
            .flags(self.flags)
            .len(len)
            .build()
            .map_err(Error::OclError)?;
        Ok(Buffer::new(buffer))
    }

    /// Creates a buffer initialized with the given host data.
    pub fn with_data(self, data: &[T]) -> Result<Buffer<T>> {
        let len = data.len().max(1);
        let buffer = ocl::Buffer::<T>::builder()
            .queue(self.device.queue().clone())
            .flags(self.flags | ocl::flags::MEM_COPY_HOST_PTR)
            .len(len)
            .copy_host_slice(data)
            .build()
            .map_err(Error::OclError)?;
        Ok(Buffer::new(buffer))
    }
}
