use thiserror::Error;

/// The error taxonomy for a single node evaluation, before it is wrapped with the offending
/// node's identity by `Error::Execution`.
#[derive(Debug, Error)]
pub enum Kind {
    #[error("variable '{0}' read before assignment and with no initial value")]
    UninitializedVariable(String),
    #[error("placeholder '{0}' has no value in the feed map")]
    MissingPlaceholder(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("rank error: {0}")]
    RankError(String),
    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),
    #[error("unknown operation: {0}")]
    UnknownOp(String),
    #[error("kernel build failed for '{op}': {log}")]
    KernelBuildFailure { op: String, log: String },
    #[error("device error: {0}")]
    DeviceError(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    /// A node evaluation failed; carries the node's identity alongside the underlying cause.
    #[error("evaluation of '{node_name}' failed: {kind}")]
    Execution {
        kind: Kind,
        node_name: String,
        node_source: Option<String>,
    },
    #[error("OpenCL error: {0}")]
    OclError(#[from] tengu_ocl::Error),
    #[error("invalid parameter: {0}")]
    ParameterError(#[from] anyhow::Error),
}

impl Error {
    /// Wraps `kind` with the identity of the node whose evaluation produced it.
    pub fn execution(kind: Kind, node_name: impl Into<String>, node_source: Option<String>) -> Self {
        Self::Execution {
            kind,
            node_name: node_name.into(),
            node_source,
        }
    }

    /// Attaches node identity to an error that reached a node boundary without one yet (an
    /// `OclError`/`ParameterError` surfaced straight from `tengu-ocl`/`tengu-backend-ocl`),
    /// wrapping it as `Kind::DeviceError`. An error that already carries node identity
    /// (`Execution`, from a nested node evaluated earlier in the walk) passes through unchanged,
    /// so wrapping at every level of the recursive walker is idempotent.
    pub fn with_node(self, node_name: impl Into<String>, node_source: Option<String>) -> Self {
        match self {
            Error::Execution { .. } => self,
            other => Self::execution(Kind::DeviceError(anyhow::Error::new(other)), node_name, node_source),
        }
    }
}

pub type Result<T> = std::result::Result<T, self::Error>;
