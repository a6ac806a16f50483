//! The graph data model this crate's evaluator walks: `Tensor` (a constant), `Variable`,
//! `Placeholder`, and `Operation`, unified behind the `Node` type. Graph construction, auto-
//! differentiation, and YAML loading are external collaborators out of scope for this crate; what
//! lives here is the minimal shape of the node these collaborators are expected to hand the
//! evaluator, matching the fields enumerated by the external interfaces this crate consumes
//! (`name`, `operation`, `items`, `options`, `shape`, `data_type`, `value`, `source`, `is_const`,
//! `breakpoint`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tengu_backend::Dtype;
use tengu_backend_ocl::DeviceBuffer;

use crate::ops::Op;

/// A scalar host value, tagged by dtype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Fp32(f32),
    Int32(i32),
    Bool(bool),
}

/// A host-side value matching a tensor's shape: either a single scalar (a rank-0 tensor) or a
/// nested sequence of narrower values, one level per declared axis. This is the `host_value`
/// `run` returns, and the representation operations that need host data (broadcast, reshape with
/// `-1`, reductions, argmin/argmax) flatten into and rebuild out of.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Scalar(Scalar),
    Array(Vec<HostValue>),
}

impl HostValue {
    pub fn fp32(v: f32) -> Self {
        HostValue::Scalar(Scalar::Fp32(v))
    }

    pub fn int32(v: i32) -> Self {
        HostValue::Scalar(Scalar::Int32(v))
    }

    /// Flattens this nested value into row-major order, keeping only the leaves.
    pub fn flatten(&self) -> Vec<Scalar> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Scalar>) {
        match self {
            HostValue::Scalar(s) => out.push(*s),
            HostValue::Array(items) => items.iter().for_each(|item| item.flatten_into(out)),
        }
    }

    /// Rebuilds a nested value of `shape` from a flat, row-major slice of scalars.
    pub fn nest(flat: &[Scalar], shape: &[usize]) -> Self {
        match shape {
            [] => HostValue::Scalar(flat.first().copied().unwrap_or(Scalar::Fp32(0.0))),
            [_] => HostValue::Array(flat.iter().map(|s| HostValue::Scalar(*s)).collect()),
            [first, rest @ ..] => {
                let stride: usize = rest.iter().product::<usize>().max(1);
                let items = (0..*first).map(|i| Self::nest(&flat[i * stride..(i + 1) * stride], rest)).collect();
                HostValue::Array(items)
            }
        }
    }
}

/// An attribute value attached to an operation node (axes, seeds, transpose flags, padding
/// specs, …).
#[derive(Clone, Debug)]
pub enum Attr {
    Bool(bool),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Pairs(Vec<(i64, i64)>),
}

/// An operation's attribute map.
#[derive(Clone, Debug, Default)]
pub struct Options(HashMap<String, Attr>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, attr: Attr) -> Self {
        self.0.insert(key.into(), attr);
        self
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(Attr::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(Attr::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn ints(&self, key: &str) -> Option<&[i64]> {
        match self.0.get(key) {
            Some(Attr::Ints(v)) => Some(v),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(Attr::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn pairs(&self, key: &str) -> Option<&[(i64, i64)]> {
        match self.0.get(key) {
            Some(Attr::Pairs(v)) => Some(v),
            _ => None,
        }
    }
}

/// A hook invoked with a fully-evaluated operation's inputs and result once its `breakpoint` flag
/// is set, mirroring the source graph's debug-dump collaborator.
pub type Breakpoint = Rc<dyn Fn(&str, &[HostValue], &HostValue)>;

/// A constant tensor: an immutable named value uploaded once and (when `is_const`) memoized for
/// the life of the backing session cache.
pub struct Tensor {
    pub name: String,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub value: HostValue,
    pub is_const: bool,
    pub source: Option<String>,
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor").field("name", &self.name).field("dtype", &self.dtype).field("shape", &self.shape).finish()
    }
}

/// A named tensor with an initial value and a mutable assigned buffer slot. Variable buffers
/// persist across evaluator `run` calls through the session-scoped buffer cache; `buffer` mirrors
/// that cache entry for fast, allocation-free access from the walker.
pub struct Variable {
    pub name: String,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub init: Option<HostValue>,
    pub(crate) buffer: RefCell<Option<Rc<RefCell<DeviceBuffer>>>>,
}

impl Variable {
    pub fn new(name: impl Into<String>, dtype: Dtype, shape: Vec<usize>, init: Option<HostValue>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            dtype,
            shape,
            init,
            buffer: RefCell::new(None),
        })
    }

    pub fn is_assigned(&self) -> bool {
        self.buffer.borrow().is_some()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable").field("name", &self.name).field("dtype", &self.dtype).field("shape", &self.shape).finish()
    }
}

/// A named tensor whose concrete value is supplied per-evaluation via the feed map on
/// `ExecutionContext`.
#[derive(Clone, Debug)]
pub struct Placeholder {
    pub name: String,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
}

/// An operation node: a tagged op over an ordered list of input nodes, an attribute map, and a
/// declared dtype/shape. `items` are pre-resolved for placeholders only by the walker; ops may
/// otherwise defer evaluating their children.
pub struct Operation {
    pub name: String,
    pub op: Op,
    pub items: Vec<Node>,
    pub options: Options,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub source: Option<String>,
    pub breakpoint: Option<Breakpoint>,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("op", &self.op)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .finish()
    }
}

/// A graph node the evaluator can walk: a constant, a variable, a placeholder, an operation, a
/// list of nodes (evaluated element-wise), an already-materialized device buffer, or a zero-arg
/// thunk invoked once and then re-walked (the "deferred producer" case the walker's contract
/// names explicitly).
#[derive(Clone)]
pub enum Node {
    Tensor(Rc<Tensor>),
    Variable(Rc<Variable>),
    Placeholder(Rc<Placeholder>),
    Operation(Rc<Operation>),
    List(Vec<Node>),
    Buffer(Rc<RefCell<DeviceBuffer>>),
    Thunk(Rc<dyn Fn() -> Node>),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Tensor(t) => write!(f, "Node::Tensor({:?})", t),
            Node::Variable(v) => write!(f, "Node::Variable({:?})", v),
            Node::Placeholder(p) => write!(f, "Node::Placeholder({:?})", p),
            Node::Operation(o) => write!(f, "Node::Operation({:?})", o),
            Node::List(items) => write!(f, "Node::List({:?})", items),
            Node::Buffer(_) => write!(f, "Node::Buffer(..)"),
            Node::Thunk(_) => write!(f, "Node::Thunk(..)"),
        }
    }
}

impl Node {
    /// The node's name, used as the memoization and retain-set key. Lists, raw buffers, and
    /// thunks have no stable name of their own.
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Tensor(t) => Some(&t.name),
            Node::Variable(v) => Some(&v.name),
            Node::Placeholder(p) => Some(&p.name),
            Node::Operation(o) => Some(&o.name),
            Node::List(_) | Node::Buffer(_) | Node::Thunk(_) => None,
        }
    }

    /// The node's declared shape, known statically without evaluating it. Used by shape-only
    /// operations (`shape`, `broadcast_gradient_args`) that do not need device data.
    pub fn declared_shape(&self) -> &[usize] {
        match self {
            Node::Tensor(t) => &t.shape,
            Node::Variable(v) => &v.shape,
            Node::Placeholder(p) => &p.shape,
            Node::Operation(o) => &o.shape,
            Node::List(_) | Node::Buffer(_) | Node::Thunk(_) => &[],
        }
    }

    pub fn constant(name: impl Into<String>, dtype: Dtype, shape: Vec<usize>, value: HostValue) -> Self {
        Node::Tensor(Rc::new(Tensor {
            name: name.into(),
            dtype,
            shape,
            value,
            is_const: true,
            source: None,
        }))
    }

    pub fn variable(name: impl Into<String>, dtype: Dtype, shape: Vec<usize>, init: Option<HostValue>) -> Self {
        Node::Variable(Variable::new(name, dtype, shape, init))
    }

    pub fn placeholder(name: impl Into<String>, dtype: Dtype, shape: Vec<usize>) -> Self {
        Node::Placeholder(Rc::new(Placeholder {
            name: name.into(),
            dtype,
            shape,
        }))
    }

    pub fn operation(name: impl Into<String>, op: Op, items: Vec<Node>, options: Options, dtype: Dtype, shape: Vec<usize>) -> Self {
        Node::Operation(Rc::new(Operation {
            name: name.into(),
            op,
            items,
            options,
            dtype,
            shape,
            source: None,
            breakpoint: None,
        }))
    }
}
