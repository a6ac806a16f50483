//! This crate defines the backend interface the evaluator is generic over: the dtype model and
//! the error taxonomy every backend implementation reports through, plus the `Backend` trait
//! itself. It is intended to be consumed by the `tengu-graph` evaluator crate and implemented by
//! a concrete backend crate such as `tengu-backend-ocl`.
//!
//! ## Modules
//!
//! - `backend`: Defines the `Backend` trait, the main interface a concrete backend implements.
//! - `error`: Defines the error taxonomy (`Kind`) and the top-level `Error::Execution` envelope
//!   that wraps a failing node's identity around it.
//! - `types`: Defines the runtime `Dtype` tag the evaluator carries instead of a compile-time
//!   generic storage type.

mod backend;
mod error;
mod types;

pub use backend::Backend;
pub use error::{Error, Kind, Result};
pub use types::Dtype;
