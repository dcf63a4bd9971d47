//! The continuation handle.
//!
//! Every driver owns one continuation slot. Whoever settles a suspension
//! (a future handler, a thunk, a stream subscription or user code holding
//! the handle) calls [`Next`], which records the outcome and schedules the
//! routine to resume on the event loop. Resumption is never synchronous.

use crate::aggregator::{self, Slot};
use crate::completion::Callback;
use crate::driver::Driver;
use crate::error::Error;
use crate::routine::Receiver;
use crate::suspension::Suspension;
use crate::value::{Outcome, Value};

use std::fmt;
use std::rc::Rc;

/// Outcome recorded through the continuation handle, in callback shape.
#[derive(Debug)]
pub(crate) struct Signal {
    pub(crate) error: Option<Error>,
    pub(crate) values: Vec<Value>,
}

impl Signal {
    /// Collapses the signal into an outcome: the error, or the first value.
    pub(crate) fn into_outcome(self) -> Outcome {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.values.into_iter().next().unwrap_or_default()),
        }
    }

    /// `[error or null, values..]`, as seen by raw-mode routines.
    pub(crate) fn into_raw(self) -> Value {
        let head = self.error.map(Value::from).unwrap_or_default();
        Value::List(std::iter::once(head).chain(self.values).collect())
    }
}

/// The continuation handle of one driver.
///
/// Clones refer to the same slot. Within one step only the first invocation
/// counts; a second invocation before the routine resumed is a protocol
/// violation that aborts the routine with [`Error::MultipleContinuations`].
/// Any invocation after the routine finished is ignored.
///
/// The handle found in the routine's [`Args`](crate::Args) serves every step.
/// A handle given to a suspension (a thunk, a custom resolver, a stream
/// subscription) belongs to that suspension's step only: invoking it again
/// once the routine has moved on is a protocol violation too.
#[derive(Clone)]
pub struct Next {
    driver: Rc<Driver>,
    /// Step the handle was issued for; `None` for the argument handle.
    step: Option<u64>,
}

impl Next {
    pub(crate) fn new(driver: Rc<Driver>) -> Self {
        Self { driver, step: None }
    }

    pub(crate) fn scoped(driver: Rc<Driver>, step: u64) -> Self {
        Self {
            driver,
            step: Some(step),
        }
    }

    /// Resumes the routine with `value`.
    pub fn resolve(&self, value: impl Into<Value>) {
        self.call(None, vec![value.into()]);
    }

    /// Resumes the routine by injecting `err` at its suspension point.
    pub fn reject(&self, err: Error) {
        self.call(Some(err), Vec::new());
    }

    pub fn settle(&self, outcome: Outcome) {
        match outcome {
            Ok(v) => self.resolve(v),
            Err(e) => self.reject(e),
        }
    }

    /// Invokes the handle the callback way: an optional error followed by
    /// any number of values.
    pub fn call(&self, error: Option<Error>, values: Vec<Value>) {
        self.driver.signal(self.step, Signal { error, values });
    }

    /// The receiver bound to the run, if any.
    pub fn receiver(&self) -> Option<&Receiver> {
        self.driver.receiver()
    }

    /// Allocates a slot in the current aggregation queue.
    pub fn push(&self) -> Slot {
        self.driver.with_aggregator(|aggregator| aggregator.push())
    }

    /// Suspension that waits for every slot of the current queue.
    ///
    /// The queue is taken on this call; slots pushed afterwards belong to a
    /// fresh queue.
    pub fn all(&self) -> Suspension {
        aggregator::all(self.driver.with_aggregator(|aggregator| aggregator.take()))
    }

    /// Suspension that waits for the first successful slot of the current
    /// queue.
    pub fn any(&self) -> Suspension {
        aggregator::any(self.driver.with_aggregator(|aggregator| aggregator.take()))
    }

    /// Discards the current queue. Outcomes of its outstanding slots are
    /// dropped on arrival.
    pub fn clear(&self) {
        self.driver.with_aggregator(|aggregator| aggregator.clear());
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("driver", &self.driver.id())
            .field("step", &self.step)
            .finish()
    }
}

impl From<Next> for Callback {
    fn from(next: Next) -> Self {
        Callback::new(move |outcome| next.settle(outcome))
    }
}
