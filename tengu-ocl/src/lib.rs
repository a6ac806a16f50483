//! This crate provides a high-level abstraction over the OpenCL API, focusing on ease of use and
//! integration with Tengu projects. It includes a set of utilities and wrappers to facilitate the
//! creation and management of OpenCL devices, buffers, programs, and kernels.
//!
//! ## Features
//!
//! - Device Handling: Bundle an OpenCL device with its context and command queue.
//! - Buffer Management: Build and manage device buffers with a small set of memory flag presets.
//! - Program Compilation: Compile kernel source strings into programs, surfacing build logs on failure.
//! - Kernel Invocation: Collect buffer and scalar arguments in call order and enqueue with explicit
//!   event dependencies.
//!
//! ## Modules
//!
//! - `device`: Wraps the OpenCL device, context, and queue.
//! - `buffer`: Contains utilities for creating and managing device buffers.
//! - `program`: Compiles kernel programs and builds kernel invocations from them.
//! - `event`: Helpers for assembling event wait-lists from buffers' last-write events.
//! - `error`: Defines error types and results used across the crate.
//!
//! ## Integration with OpenCL
//!
//! This crate is built on top of the `ocl` crate, providing a more ergonomic interface for common
//! tasks while leveraging the power of OpenCL's asynchronous, event-driven execution model.

mod buffer;
mod device;
mod error;
mod event;
mod program;

pub use buffer::{Buffer, BufferBuilder};
pub use device::Device;
pub use error::{Error, Result};
pub use event::wait_list;
pub use program::{KernelBuilder, Program, ProgramBuilder};
