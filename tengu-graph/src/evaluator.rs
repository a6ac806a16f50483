//! The public entry point: `Evaluator` binds a backend session to a randomizer and a set of
//! construction options, and exposes the `run`/`run_retaining` operations external callers drive
//! the graph through.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tengu_backend::Backend;
use tengu_backend_ocl::OclBackend;

use crate::context::{EvaluatorOptions, ExecutionContext, HistoryEntry};
use crate::eval::eval_node;
use crate::error::Result;
use crate::randomizer::Randomizer;
use crate::tensor::{HostValue, Node};

/// The result of a `run_retaining` call: the node's host-materialized value, plus the
/// intermediate-computation history recorded if `log_intermediates` was set.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub value: HostValue,
    pub history: Vec<HistoryEntry>,
}

/// Binds one OpenCL session (device, context, queue, compiled-kernel cache, buffer cache) to a
/// randomizer and the options it was constructed with. Cheap to clone (an `Rc` around the
/// backend); a fresh `ExecutionContext` is built per `run` call, but buffers and compiled kernels
/// persist on the backend's `SessionCache` across calls.
pub struct Evaluator {
    backend: Rc<OclBackend>,
    randomizer: Randomizer,
    options: EvaluatorOptions,
    graph_seed: Option<u64>,
}

impl Evaluator {
    /// Builds an evaluator against the default OpenCL device, reading kernels from the default
    /// resource directory.
    pub async fn new() -> Result<Self> {
        Self::with_options(EvaluatorOptions::default()).await
    }

    /// Builds an evaluator with explicit construction options (an alternate kernel source
    /// directory, or `log_intermediates` turned on).
    pub async fn with_options(options: EvaluatorOptions) -> Result<Self> {
        let backend = OclBackend::with_kernel_dir(options.kernel_source_dir.clone()).await?;
        Ok(Self {
            backend,
            randomizer: Randomizer::new(),
            options,
            graph_seed: None,
        })
    }

    /// Returns an evaluator that seeds every graph-scoped random draw (`random_uniform`,
    /// `random_normal`, `glorot_uniform` with no op-level seed of their own) from `seed`.
    pub fn with_graph_seed(mut self, seed: u64) -> Self {
        self.graph_seed = Some(seed);
        self
    }

    /// Evaluates `node` against `feeds`, discarding intermediates once the run completes.
    pub fn run(&self, node: &Node, feeds: HashMap<String, HostValue>) -> Result<HostValue> {
        Ok(self.run_retaining(node, feeds, HashSet::new())?.value)
    }

    /// Evaluates `node` against `feeds`, keeping buffers for every name in `retain` resident in
    /// the session's buffer cache past this call (so a later `run` referencing the same name by
    /// an identical `Node::Buffer`/cached name can reuse it without recomputation).
    pub fn run_retaining(&self, node: &Node, feeds: HashMap<String, HostValue>, retain: HashSet<String>) -> Result<RunOutcome> {
        let ctx = ExecutionContext::new(retain, feeds, self.options.log_intermediates);
        let evaluated = eval_node(self.backend.session_cache(), &self.randomizer, self.graph_seed, node, &ctx)?;
        let value = crate::eval::evaluated_to_host_value(self.backend.session_cache(), &evaluated)?;
        self.backend.finish()?;
        Ok(RunOutcome {
            value,
            history: ctx.take_history(),
        })
    }
}
