//! Utilities for memory-efficient data structures.
//!
//! This module exposes a [`Slab`] used by the event loop for indexed storage
//! of local tasks with reuse of freed slots.

mod slab;

pub(crate) use slab::Slab;
