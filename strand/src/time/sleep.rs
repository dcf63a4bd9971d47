use crate::error::Error;
use crate::promise::Promise;
use crate::runtime::context;
use crate::value::Value;

use std::time::{Duration, Instant};

/// Returns a promise that resolves with `Null` after `duration`.
///
/// The timer is registered immediately with the current event loop. Outside
/// of a loop the promise is already rejected with [`Error::NoEventLoop`].
///
/// # Examples
///
/// ```rust,ignore
/// co.suspend(time::sleep(Duration::from_millis(10))).await?;
/// ```
pub fn sleep(duration: Duration) -> Promise {
    let Some(handle) = context::current() else {
        return Promise::rejected(Error::NoEventLoop);
    };

    let (promise, deferred) = Promise::pending();
    handle.add_timer(
        Instant::now() + duration,
        Box::new(move || deferred.resolve(Value::Null)),
    );

    promise
}
