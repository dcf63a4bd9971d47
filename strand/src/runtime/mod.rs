//! Core runtime components.
//!
//! This module contains the single-threaded event loop that every routine
//! runs on. It is responsible for:
//! - the run queue of deferred resumptions,
//! - timers,
//! - local `Future` tasks and their wakers,
//! - the thread-local context through which drivers find the loop.
//!
//! Most users only touch [`EventLoop`] and [`task::spawn_local`]; the rest is
//! used internally by the driver and the time utilities.

mod core;
mod timer;

pub(crate) mod context;

pub mod task;

pub use self::core::EventLoop;
pub(crate) use self::core::LoopHandle;
pub use timer::Timer;
