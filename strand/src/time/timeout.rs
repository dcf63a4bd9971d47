use crate::error::Error;
use crate::runtime::{Timer, context};

use std::time::{Duration, Instant};

/// Schedules `f` to run once `delay` has elapsed.
///
/// The returned [`Timer`] can cancel the callback before it fires.
///
/// # Errors
///
/// Returns [`Error::NoEventLoop`] when called outside of an event loop.
///
/// # Examples
///
/// ```rust,ignore
/// let next = args.next().unwrap();
/// time::set_timeout(Duration::ZERO, move || next.resolve(()))?;
/// ```
pub fn set_timeout<F>(delay: Duration, f: F) -> Result<Timer, Error>
where
    F: FnOnce() + 'static,
{
    let handle = context::current().ok_or(Error::NoEventLoop)?;
    Ok(handle.add_timer(Instant::now() + delay, Box::new(f)))
}
