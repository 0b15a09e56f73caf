//! Executor trait for spawning the per-structure fan-out tasks (§4.8, §5).

use std::future::Future;
use tokio::task::JoinHandle;

/// Abstracts over how the tick scheduler spawns one task per guarded
/// structure. §5 allows "a thread-per-structure model or a bounded
/// worker pool"; this trait lets either sit behind the same `FanOut`
/// step without `TickScheduler` depending on a concrete runtime.
pub trait Executor: Clone + Send + Sync + 'static {
    /// Spawns a future onto this executor, returning a handle that can be
    /// awaited for its result.
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

impl Executor for tokio::runtime::Handle {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::runtime::Handle::spawn(self, future)
    }
}
