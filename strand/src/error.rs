//! Error taxonomy of the scheduler.

use crate::value::Value;

use thiserror::Error;

/// Errors produced while driving a routine.
///
/// Errors are plain values: they are injected back into a paused routine at
/// its suspension point, stored by aggregation slots and delivered to terminal
/// callbacks, so they are cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Raised by a routine body, or carried by a rejected future or a failed
    /// aggregation slot.
    #[error("{0}")]
    Raised(Value),

    /// A future-like value rejected without a reason.
    #[error("future rejected without a reason")]
    Rejected,

    /// The continuation handle was invoked twice before the routine resumed.
    #[error("Multiple continuations within one step")]
    MultipleContinuations,

    /// A run with neither a terminal callback nor a future sink failed.
    ///
    /// Nobody can observe the failure through the normal channel, so it is
    /// returned synchronously from the start operation or from
    /// [`EventLoop::run`](crate::EventLoop::run).
    #[error("unobserved routine failure: {0}")]
    Unobserved(Box<Error>),

    /// An operation that needs the scheduler ran outside of an event loop.
    #[error("no event loop is running on this thread")]
    NoEventLoop,

    /// A routine paused without yielding a suspension value.
    #[error("routine paused without yielding a value")]
    Stalled,

    /// The event loop went idle before the routine completed.
    #[error("event loop went idle before the routine completed")]
    Incomplete,

    #[error("expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },
}

impl Error {
    /// Builds a [`Error::Raised`] error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Raised(Value::Str(message.into()))
    }

    /// Builds a [`Error::Raised`] error carrying an arbitrary payload.
    pub fn raise(payload: impl Into<Value>) -> Self {
        Error::Raised(payload.into())
    }

    pub(crate) fn mismatch(expected: &'static str, found: &Value) -> Self {
        Error::Type {
            expected,
            found: found.kind(),
        }
    }

    /// Returns the payload of a raised error.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Error::Raised(v) => Some(v),
            Error::Unobserved(inner) => inner.payload(),
            _ => None,
        }
    }

    /// Returns `true` for the "multiple continuations" protocol violation,
    /// whether or not it escaped unobserved.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Error::MultipleContinuations => true,
            Error::Unobserved(inner) => inner.is_protocol_violation(),
            _ => false,
        }
    }
}

impl From<Error> for Value {
    /// Flattens an error into a value, as raw-mode resumption does.
    fn from(err: Error) -> Self {
        match err {
            Error::Raised(v) => v,
            other => Value::Str(other.to_string()),
        }
    }
}
