//! # Strand
//!
//! **Strand** is a single-threaded cooperative scheduler for suspendable
//! routines. A routine pauses at explicit suspension points on *suspension
//! values* (futures, nested routines, thunks, streams or plain values) and the
//! scheduler resumes it, on a later turn of the event loop, with the value
//! those resolve to or with the error they fail with.
//!
//! Strand is built around a few small pieces:
//!
//! - A **driver** per routine that resumes it step by step and delivers the
//!   final outcome to a terminal callback or a [`Promise`]
//! - A **continuation handle** ([`Next`]) that any callback-style operation
//!   can invoke to wake the routine up
//! - An **aggregation queue** for waiting on several callback-style operations
//!   at once, with `all` and `any` semantics
//! - A **FIFO event loop** with timers and support for local Rust futures
//! - **Ergonomic macros** like `#[strand::main]` and `#[strand::test]`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strand::{Args, Co, Error, Promise};
//!
//! #[strand::main]
//! async fn main(co: Co, _args: Args) -> Result<(), Error> {
//!     let greeting = co.suspend(Promise::resolved("hello")).await?;
//!     println!("{greeting}");
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`time`]: Timers and sleep
//! - [`task`]: Local futures on the event loop
//! - [`stream`]: Subscribable streams
//! - [`logging`]: Log output for the scheduler's events

mod aggregator;
mod completion;
mod config;
mod continuation;
mod driver;
mod error;
mod promise;
mod resolver;
mod routine;
mod runner;
mod runtime;
mod suspension;
mod utils;
mod value;

pub mod logging;
pub mod stream;
pub mod time;

pub use aggregator::Slot;
pub use completion::Callback;
pub use config::{Config, ConfigBuilder, CustomYieldable};
pub use continuation::Next;
pub use error::Error;
pub use promise::{Deferred, OnFulfilled, OnRejected, Promise, PromiseFactory, Thenable};
pub use routine::{
    Arg, Args, Co, Receiver, Resume, Routine, RoutineFn, RoutineSource, Step, Suspend, routine,
};
pub use runner::{
    Entry, Launch, Registry, Runner, Wrapped, block_on, run, run_with, spawn, wrap, wrap_all,
};
pub use runtime::{EventLoop, task};
pub use suspension::Suspension;
pub use value::{Outcome, Value};

pub use strand_macros::*;
