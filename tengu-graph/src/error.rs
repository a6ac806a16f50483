use thiserror::Error;

pub use tengu_backend::Kind;

/// This crate's error type wraps the backend's execution taxonomy (`tengu_backend::Error`, the
/// `Kind`/`Execution` envelope every node failure reports through) and adds the one graph-level
/// concern the backend doesn't know about: a node referenced by name that the graph never
/// declared.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] tengu_backend::Error),
    #[error("node '{0}' is not present in the graph")]
    UnknownNode(String),
    #[error("invalid parameter: {0}")]
    ParameterError(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, self::Error>;
