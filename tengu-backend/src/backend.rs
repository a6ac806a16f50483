#![allow(async_fn_in_trait)]

use std::rc::Rc;

use crate::Result;

/// The interface a concrete evaluation backend must provide: a session-scoped cache of device
/// resources. The `SessionCache` associated type owns the device/context/queue, the compiled
/// kernel cache, and the buffer cache, and is threaded explicitly through every call instead of
/// living behind a shared, untyped `self`-owned map.
pub trait Backend {
    /// The session-scoped cache of device/context/queue/kernels/buffers this backend maintains
    /// across `run` invocations.
    type SessionCache;

    /// Creates a new backend instance, initializing the device, context, and command queue.
    async fn new() -> Result<Rc<Self>>;

    /// Returns the session cache this backend maintains across evaluator runs.
    fn session_cache(&self) -> &Self::SessionCache;

    /// Blocks until every command this backend has enqueued so far has completed.
    fn finish(&self) -> Result<()>;
}
