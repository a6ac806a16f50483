//! `tengu-graph` evaluates a symbolic tensor computation graph handed to it by an external graph
//! builder (construction, autodiff, and YAML loading all live outside this crate) on an OpenCL
//! device. The graph is a tree of [`Node`]s — constants, variables, placeholders, and tagged
//! operations — and evaluation is a single recursive, memoized walk that dispatches each
//! operation straight to a compiled OpenCL kernel rather than building an intermediate IR.
//!
//! # Key modules
//!
//! - [`tensor`]: the node data model (`Tensor`, `Variable`, `Placeholder`, `Operation`, `Node`).
//! - [`ops`]: the closed set of operation tags and their kernel names.
//! - [`context`]: per-run state (`ExecutionContext`) threaded through the walk.
//! - [`eval`]: the recursive walker itself.
//! - [`reduce`]: axis reductions and `broadcast_gradient_args`.
//! - [`randomizer`]: deterministic-or-entropy random number generator selection.
//! - [`evaluator`]: the public entry point, [`Evaluator`].
//!
//! # Usage
//!
//! ```no_run
//! use std::collections::HashMap;
//! use tengu_backend::Dtype;
//! use tengu_graph::{Evaluator, HostValue, Node};
//!
//! # async fn run() -> tengu_graph::Result<()> {
//! let evaluator = Evaluator::new().await?;
//! let a = Node::constant("a", Dtype::Fp32, vec![2], HostValue::Array(vec![HostValue::fp32(1.0), HostValue::fp32(2.0)]));
//! let b = Node::constant("b", Dtype::Fp32, vec![2], HostValue::Array(vec![HostValue::fp32(3.0), HostValue::fp32(4.0)]));
//! let sum = Node::operation("sum", tengu_graph::Op::Add, vec![a, b], tengu_graph::Options::new(), Dtype::Fp32, vec![2]);
//! let result = evaluator.run(&sum, HashMap::new())?;
//! println!("{result:?}");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod eval;
pub mod evaluator;
pub mod ops;
pub mod randomizer;
pub mod reduce;
mod result;
pub mod tensor;
pub mod unify;

pub use context::{EvaluatorOptions, HistoryEntry};
pub use error::{Error, Kind, Result};
pub use evaluator::{Evaluator, RunOutcome};
pub use ops::Op;
pub use tensor::{Attr, Breakpoint, HostValue, Node, Options, Placeholder, Scalar, Tensor, Variable};
