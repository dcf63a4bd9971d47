//! Suspendable routines.
//!
//! A routine is a computation that pauses at explicit suspension points. The
//! driver owns it exclusively and re-enters it through [`Routine::resume`],
//! either with the resolved value of the last suspension or with an error
//! injected at that very point.
//!
//! Routines can be written by hand as state machines, or as `async` bodies
//! through [`routine`](crate::routine()), where `co.suspend(x).await` is the
//! pause point.

mod args;
mod co;

pub use args::{Arg, Args, Receiver};
pub use co::{Co, Suspend, routine};

use crate::error::Error;
use crate::suspension::Suspension;
use crate::value::Value;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// What the driver feeds into a routine.
#[derive(Debug)]
pub enum Resume {
    /// First entry, with the invocation arguments (continuation included).
    Start(Args),
    /// The last suspension resolved with this value.
    Value(Value),
    /// The last suspension failed; the error surfaces at the pause point.
    Throw(Error),
}

impl Resume {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Resume::Start(_) => "start",
            Resume::Value(_) => "value",
            Resume::Throw(_) => "throw",
        }
    }
}

/// What a routine hands back to the driver when it pauses or ends.
pub enum Step {
    /// Paused on a suspension value.
    Yield(Suspension),
    /// Finished. A resolvable final value is resolved once more before the
    /// run completes.
    Return(Suspension),
    /// Finished with an unrecovered error.
    Raise(Error),
}

impl Step {
    /// Finishes with a plain value.
    pub fn done(value: impl Into<Value>) -> Step {
        Step::Return(Suspension::Value(value.into()))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Yield(s) => f.debug_tuple("Yield").field(&s.kind()).finish(),
            Step::Return(s) => f.debug_tuple("Return").field(&s.kind()).finish(),
            Step::Raise(e) => f.debug_tuple("Raise").field(e).finish(),
        }
    }
}

/// A paused computation driven by the scheduler.
pub trait Routine {
    /// Re-enters the routine and runs it up to its next pause point.
    fn resume(&mut self, input: Resume) -> Step;
}

/// A routine that has already run to completion.
///
/// Resuming it finishes immediately with `Null`, like an exhausted generator.
struct Finished;

impl Routine for Finished {
    fn resume(&mut self, _input: Resume) -> Step {
        Step::done(Value::Null)
    }
}

/// A callable producing fresh routine instances.
///
/// Clones share the same factory.
#[derive(Clone)]
pub struct RoutineFn {
    make: Rc<dyn Fn() -> Box<dyn Routine>>,
}

impl RoutineFn {
    pub fn new<F>(make: F) -> Self
    where
        F: Fn() -> Box<dyn Routine> + 'static,
    {
        Self {
            make: Rc::new(make),
        }
    }

    /// Wraps a live instance.
    ///
    /// The first call hands out the instance itself; later calls get a
    /// routine that is already finished.
    pub fn once(instance: Box<dyn Routine>) -> Self {
        let slot = RefCell::new(Some(instance));
        Self::new(move || match slot.borrow_mut().take() {
            Some(instance) => instance,
            None => Box::new(Finished),
        })
    }

    /// Creates a new instance, not yet started.
    pub fn instantiate(&self) -> Box<dyn Routine> {
        (self.make)()
    }
}

impl fmt::Debug for RoutineFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineFn").finish_non_exhaustive()
    }
}

/// Anything the driver can run: a routine factory or a live instance.
pub enum RoutineSource {
    Factory(RoutineFn),
    Instance(Box<dyn Routine>),
}

impl RoutineSource {
    pub(crate) fn into_routine(self) -> Box<dyn Routine> {
        match self {
            RoutineSource::Factory(f) => f.instantiate(),
            RoutineSource::Instance(r) => r,
        }
    }
}

impl From<RoutineFn> for RoutineSource {
    fn from(f: RoutineFn) -> Self {
        RoutineSource::Factory(f)
    }
}

impl From<&RoutineFn> for RoutineSource {
    fn from(f: &RoutineFn) -> Self {
        RoutineSource::Factory(f.clone())
    }
}

impl<R: Routine + 'static> From<R> for RoutineSource {
    fn from(routine: R) -> Self {
        RoutineSource::Instance(Box::new(routine))
    }
}

impl From<RoutineSource> for RoutineFn {
    fn from(source: RoutineSource) -> Self {
        match source {
            RoutineSource::Factory(f) => f,
            RoutineSource::Instance(r) => RoutineFn::once(r),
        }
    }
}
