//! The per-run evaluation context: the memo map keyed by node name, the retain set that decides
//! which intermediates survive past the run that produced them, and the placeholder feed map. A
//! fresh `ExecutionContext` is built for every `Evaluator::run` call; the backend's `SessionCache`
//! (buffers, compiled kernels) is what persists across runs instead.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use tengu_backend::Dtype;
use tengu_backend_ocl::DeviceBuffer;

use crate::tensor::HostValue;

/// Options controlling a single evaluator construction. `kernel_source_dir` points the backend's
/// kernel registry at an alternate directory of `.cl` sources; `log_intermediates` turns on
/// per-node tracing of shapes and dtypes as the walker descends.
#[derive(Clone, Debug)]
pub struct EvaluatorOptions {
    pub kernel_source_dir: PathBuf,
    pub log_intermediates: bool,
    /// Reserved for a future parallel walker; the evaluator dispatches every node sequentially
    /// today and never reads this field.
    pub thread_pool: Option<std::num::NonZeroUsize>,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            kernel_source_dir: PathBuf::from(tengu_backend_ocl::DEFAULT_KERNEL_DIR),
            log_intermediates: false,
            thread_pool: None,
        }
    }
}

/// The evaluated form of a node: either a single device buffer or a list of them, for operations
/// such as `flow_group` and `broadcast_transform` that return more than one value.
#[derive(Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Evaluated {
    Buffer(Rc<RefCell<DeviceBuffer>>),
    List(Vec<Evaluated>),
}

impl Evaluated {
    pub fn as_buffer(&self) -> Option<&Rc<RefCell<DeviceBuffer>>> {
        match self {
            Evaluated::Buffer(b) => Some(b),
            Evaluated::List(_) => None,
        }
    }

    pub fn into_list(self) -> Vec<Evaluated> {
        match self {
            Evaluated::List(items) => items,
            single => vec![single],
        }
    }
}

/// A single entry in the intermediate-computation log recorded while `log_intermediates` is
/// enabled: an operation's name, declared dtype/shape, source provenance, the op tag it dispatched
/// through, and its fully host-materialized result.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub name: String,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub source: Option<String>,
    pub description: String,
    pub host_value: HostValue,
}

/// Per-run state threaded through the recursive walker: memoized node results (so a node shared
/// by multiple parents in the same run is evaluated once), the set of node names to retain beyond
/// this run (everything else is eligible for eviction from the result-buffer cache once the run
/// completes), and the placeholder feed map.
pub struct ExecutionContext {
    memo: RefCell<HashMap<String, Evaluated>>,
    retain: HashSet<String>,
    feeds: HashMap<String, HostValue>,
    log_intermediates: bool,
    history: RefCell<Vec<HistoryEntry>>,
}

impl ExecutionContext {
    pub fn new(retain: HashSet<String>, feeds: HashMap<String, HostValue>, log_intermediates: bool) -> Self {
        Self {
            memo: RefCell::new(HashMap::new()),
            retain,
            feeds,
            log_intermediates,
            history: RefCell::new(Vec::new()),
        }
    }

    pub fn memo_get(&self, name: &str) -> Option<Evaluated> {
        self.memo.borrow().get(name).cloned()
    }

    pub fn memo_put(&self, name: &str, value: Evaluated) {
        self.memo.borrow_mut().insert(name.to_string(), value);
    }

    pub fn is_retained(&self, name: &str) -> bool {
        self.retain.contains(name)
    }

    pub fn feed(&self, name: &str) -> Option<&HostValue> {
        self.feeds.get(name)
    }

    pub fn log_intermediates(&self) -> bool {
        self.log_intermediates
    }

    pub fn push_history(&self, entry: HistoryEntry) {
        self.history.borrow_mut().push(entry);
    }

    /// Drains the intermediate-computation log recorded so far this run.
    pub fn take_history(&self) -> Vec<HistoryEntry> {
        std::mem::take(&mut self.history.borrow_mut())
    }
}
