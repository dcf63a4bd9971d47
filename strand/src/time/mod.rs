//! Time utilities.
//!
//! Timers live on the event loop of the current thread. They fire once the
//! run queue has drained, earliest deadline first and, for equal deadlines,
//! in registration order.
//!
//! It includes:
//! - [`set_timeout`] for scheduling a callback,
//! - [`sleep`] for a promise that resolves after a delay.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::sleep;

#[doc(inline)]
pub use timeout::set_timeout;

pub use crate::runtime::Timer;
