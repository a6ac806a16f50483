//! This module provides functionality for compiling kernel programs and building kernel
//! invocations from them: a builder for compiling source into a `Program`, and a builder for
//! assembling a kernel's buffer and scalar arguments before enqueuing it.

use std::ops::Deref;

use crate::Device;
use crate::{Error, Result};

/// A compiled OpenCL program, ready to have kernels created from it.
#[derive(Clone)]
pub struct Program {
    program: ocl::Program,
}

impl Program {
    /// Creates a kernel builder for the named entry point in this program.
    pub fn kernel<'a>(&'a self, device: &'a Device, name: &'a str) -> KernelBuilder<'a> {
        KernelBuilder::new(device, &self.program, name)
    }
}

impl Deref for Program {
    type Target = ocl::Program;
    fn deref(&self) -> &Self::Target {
        &self.program
    }
}

/// Builder for compiling an OpenCL program from source.
pub struct ProgramBuilder<'device> {
    device: &'device Device,
}

impl<'device> ProgramBuilder<'device> {
    pub fn new(device: &'device Device) -> Self {
        Self { device }
    }

    /// Compiles `source` into a `Program`, surfacing the device build log on failure.
    pub fn build(self, source: &str) -> Result<Program> {
        let program = ocl::Program::builder()
            .devices(**self.device)
            .src(source)
            .build(self.device.context())
            .map_err(|e| Error::ProgramBuildError(e.into()))?;
        Ok(Program { program })
    }
}

/// Builder for a single kernel invocation, collecting buffer and scalar arguments in call order.
pub struct KernelBuilder<'a> {
    device: &'a Device,
    program: &'a ocl::Program,
    name: &'a str,
    global_work_size: [usize; 2],
    builder: ocl::builders::KernelBuilder<'a>,
}

impl<'a> KernelBuilder<'a> {
    fn new(device: &'a Device, program: &'a ocl::Program, name: &'a str) -> Self {
        let mut builder = ocl::Kernel::builder();
        builder.program(program).name(name).queue(device.queue().clone());
        Self {
            device,
            program,
            name,
            global_work_size: [1, 1],
            builder,
        }
    }

    /// Sets the 2-D global work size (`[rows, cols]`) this kernel will be enqueued over.
    pub fn global_work_size(mut self, rows: usize, cols: usize) -> Self {
        self.global_work_size = [rows, cols];
        self.builder.global_work_size([rows, cols]);
        self
    }

    /// Appends a buffer argument, in call order.
    pub fn arg_buf<T: ocl::OclPrm>(mut self, buffer: &ocl::Buffer<T>) -> Self {
        self.builder.arg(buffer);
        self
    }

    /// Appends a scalar argument, in call order.
    pub fn arg_scalar<T: ocl::OclPrm>(mut self, value: T) -> Self {
        self.builder.arg(value);
        self
    }

    /// Builds and enqueues the kernel, waiting on `wait_for` and returning the completion event.
    ///
    /// # Safety
    /// The caller must ensure the kernel source does not violate memory aliasing rules for the
    /// buffers passed as arguments; this mirrors the `unsafe` contract `ocl::Kernel::enq` carries.
    pub unsafe fn enqueue(mut self, wait_for: &ocl::EventList) -> Result<ocl::Event> {
        let kernel = self
            .builder
            .build()
            .map_err(|e| Error::KernelError(self.name.to_string(), e.into()))?;
        let mut event = ocl::Event::empty();
        kernel
            .cmd()
            .queue(self.device.queue())
            .global_work_size(self.global_work_size)
            .ewait(wait_for)
            .enew(&mut event)
            .enq()
            .map_err(Error::OclError)?;
        Ok(event)
    }
}
