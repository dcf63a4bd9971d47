use crate::continuation::Next;
use crate::promise::{LocalThenable, Promise, Thenable};
use crate::routine::{RoutineFn, RoutineSource};
use crate::stream::Subscribable;
use crate::value::{Outcome, Value};

use std::any::Any;
use std::fmt;
use std::future::Future;

/// A value a routine pauses on.
///
/// The resolver recognizes the variants in declaration order of precedence:
/// future-like values, nested routines, thunks, then streams. Plain values
/// and opaque payloads go to the configured custom resolver, if any.
pub enum Suspension {
    Future(Box<dyn Thenable>),
    Routine(RoutineSource),
    /// A function that takes the continuation handle as its only argument.
    Thunk(Box<dyn FnOnce(Next)>),
    Stream(Box<dyn Subscribable>),
    Value(Value),
    Other(Box<dyn Any>),
}

impl Suspension {
    /// Suspends on a Rust future, run as a local task of the current loop.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Outcome> + 'static,
    {
        Suspension::Future(Box::new(LocalThenable { future }))
    }

    /// Suspends on any future-like value.
    pub fn thenable(thenable: impl Thenable + 'static) -> Self {
        Suspension::Future(Box::new(thenable))
    }

    pub fn thunk(f: impl FnOnce(Next) + 'static) -> Self {
        Suspension::Thunk(Box::new(f))
    }

    pub fn stream(stream: impl Subscribable + 'static) -> Self {
        Suspension::Stream(Box::new(stream))
    }

    pub fn routine(routine: impl Into<RoutineSource>) -> Self {
        Suspension::Routine(routine.into())
    }

    /// An opaque payload, meaningful only to a custom resolver.
    pub fn other(payload: impl Any) -> Self {
        Suspension::Other(Box::new(payload))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Suspension::Future(_) => "future",
            Suspension::Routine(_) => "routine",
            Suspension::Thunk(_) => "thunk",
            Suspension::Stream(_) => "stream",
            Suspension::Value(_) => "value",
            Suspension::Other(_) => "other",
        }
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suspension::Value(v) => f.debug_tuple("Value").field(v).finish(),
            other => f.debug_tuple("Suspension").field(&other.kind()).finish(),
        }
    }
}

impl From<Promise> for Suspension {
    fn from(promise: Promise) -> Self {
        Suspension::Future(Box::new(promise))
    }
}

impl From<RoutineFn> for Suspension {
    fn from(routine: RoutineFn) -> Self {
        Suspension::Routine(RoutineSource::Factory(routine))
    }
}

impl From<&RoutineFn> for Suspension {
    fn from(routine: &RoutineFn) -> Self {
        Suspension::Routine(RoutineSource::Factory(routine.clone()))
    }
}

impl From<RoutineSource> for Suspension {
    fn from(source: RoutineSource) -> Self {
        Suspension::Routine(source)
    }
}

macro_rules! value_suspension {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Suspension {
                fn from(v: $ty) -> Self {
                    Suspension::Value(Value::from(v))
                }
            }
        )*
    };
}

value_suspension!(Value, (), bool, i32, i64, u32, usize, f64, &str, String, Vec<Value>);
