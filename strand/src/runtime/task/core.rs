use super::waker::TaskWaker;
use crate::promise::Promise;
use crate::runtime::context;
use crate::value::Outcome;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed local future driven by the event loop.
pub(crate) type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A spawned local task.
///
/// The future is taken out of the slot while it is being polled, so a task
/// that spawns other tasks never re-enters the slab borrow.
pub(crate) struct LocalTask {
    /// The underlying future; `None` while it is being polled.
    pub(crate) future: Option<LocalFuture>,

    /// Wake-up bookkeeping shared with every `Waker` handed to the future.
    pub(crate) waker: Arc<TaskWaker>,
}

/// Spawns a future onto the current event loop and returns a promise for its
/// outcome.
///
/// The future does not need to be `Send`: it is polled on the loop's thread
/// whenever one of its wakers fires. Called outside of a loop, the returned
/// promise is already rejected with [`Error::NoEventLoop`](crate::Error::NoEventLoop).
///
/// # Examples
///
/// ```rust,ignore
/// let promise = task::spawn_local(async { Ok(Value::from(42)) });
/// ```
pub fn spawn_local<F>(future: F) -> Promise
where
    F: Future<Output = Outcome> + 'static,
{
    let Some(handle) = context::current() else {
        return Promise::rejected(crate::Error::NoEventLoop);
    };

    let (promise, deferred) = Promise::pending();

    handle.spawn(Box::pin(async move {
        deferred.settle(future.await);
    }));

    promise
}
