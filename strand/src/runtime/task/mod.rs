//! Local task primitives.
//!
//! This module lets ordinary Rust futures take part in the scheduler. A
//! spawned future is stored in the loop's slab, polled when its waker fires
//! and reports its outcome through a [`Promise`](crate::Promise), which makes it
//! a regular future-like suspension for routines.

pub(crate) mod state;
pub(crate) mod waker;

mod core;

pub(crate) use self::core::{LocalFuture, LocalTask};

pub use self::core::spawn_local;
