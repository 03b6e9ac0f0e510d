use std::{pin::Pin, task::Context};

pub use futures::future::BoxFuture;

/// A future which is polled from a frame loop instead of an executor.
///
/// Every call to [`PendingTask::poll_ready`] polls once with a no-op waker, so the owner has to
/// keep calling it (e.g. on every UI frame) until the value arrives.
pub struct PendingTask<T>(Option<BoxFuture<'static, T>>);

impl<T> PendingTask<T> {
    pub fn new(future: BoxFuture<'static, T>) -> Self {
        Self(Some(future))
    }

    /// Returns the result exactly once. Afterwards the task is spent and always returns `None`.
    pub fn poll_ready(&mut self) -> Option<T> {
        let future = self.0.as_mut()?;
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        match Pin::new(future).poll(&mut cx) {
            std::task::Poll::Ready(r) => {
                self.0 = None;
                Some(r)
            }
            std::task::Poll::Pending => None,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.0.is_none()
    }
}

/// Runs `job` on a fresh thread and resolves with its result.
///
/// Dropping the returned future detaches the thread; its result is discarded.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_blocking<T, E>(
    job: impl FnOnce() -> Result<T, E> + Send + 'static,
) -> BoxFuture<'static, Result<T, E>>
where
    T: Send + 'static,
    E: From<futures::channel::oneshot::Canceled> + Send + 'static,
{
    use futures::FutureExt;

    let (tx, rx) = futures::channel::oneshot::channel();
    std::thread::spawn(move || {
        // Receiver may be gone when the caller lost interest
        let _ = tx.send(job());
    });
    async move { rx.await.map_err(E::from).and_then(|r| r) }.boxed()
}
