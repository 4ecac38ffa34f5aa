/// A trait that abstracts over how worker tasks are spawned and joined.
///
/// This allows [`AsyncWorkerGroup`] to be generic over runtimes like `Tokio`
/// or `Smol`.
///
/// [`AsyncWorkerGroup`]: crate::AsyncWorkerGroup
pub trait SpawnProvider {
    /// Handle to a spawned task. We require `Send` so that a group can be
    /// moved across threads.
    type Handle: Send + 'static;

    /// Spawns `future` onto the runtime.
    fn spawn<F>(future: F) -> Self::Handle
    where
        F: Future<Output = ()> + Send + 'static;

    /// Waits for a spawned task to finish.
    ///
    /// Resolves to `true` if the task ran to completion and `false` if it
    /// panicked or was cancelled.
    fn join(handle: Self::Handle) -> impl Future<Output = bool> + Send;
}
