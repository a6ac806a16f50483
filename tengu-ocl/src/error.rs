use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no suitable OpenCL platform found")]
    NoPlatform,
    #[error("no suitable OpenCL device found")]
    NoDevice,
    #[error("cannot create OpenCL context: {0}")]
    ContextError(#[source] anyhow::Error),
    #[error("cannot create command queue: {0}")]
    QueueError(#[source] anyhow::Error),
    #[error("cannot build program: {0}")]
    ProgramBuildError(#[source] anyhow::Error),
    #[error("cannot create kernel '{0}': {1}")]
    KernelError(String, #[source] anyhow::Error),
    #[error("cannot create buffer: {0}")]
    BufferError(#[from] anyhow::Error),
    #[error("OpenCL error: {0}")]
    OclError(#[from] ocl::Error),
}

pub type Result<T> = std::result::Result<T, self::Error>;
