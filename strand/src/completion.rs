use crate::error::Error;
use crate::promise::Deferred;
use crate::value::Outcome;

use std::fmt;

use tracing::warn;

/// A terminal callback, invoked once with the final outcome of a run.
pub struct Callback(Box<dyn FnOnce(Outcome)>);

impl Callback {
    pub fn new(f: impl FnOnce(Outcome) + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn call(self, outcome: Outcome) {
        (self.0)(outcome)
    }
}

impl<F> From<F> for Callback
where
    F: FnOnce(Outcome) + 'static,
{
    fn from(f: F) -> Self {
        Callback::new(f)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Where the final outcome of a run goes.
#[derive(Debug)]
pub(crate) enum Completion {
    Callback(Callback),
    Future(Deferred),
    /// No observer. This is the raw-throw mode: instead of being delivered,
    /// a failure escapes to the caller as [`Error::Unobserved`].
    Unobserved,
}

impl Completion {
    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Completion::Callback(_) => "callback",
            Completion::Future(_) => "future",
            Completion::Unobserved => "unobserved",
        }
    }

    pub(crate) fn deliver(self, outcome: Outcome) -> Result<(), Error> {
        match self {
            Completion::Callback(cb) => {
                cb.call(outcome);
                Ok(())
            }
            Completion::Future(deferred) => {
                deferred.settle(outcome);
                Ok(())
            }
            Completion::Unobserved => match outcome {
                Ok(_) => Ok(()),
                Err(err) => {
                    warn!(error = %err, "unobserved routine failed");
                    Err(Error::Unobserved(Box::new(err)))
                }
            },
        }
    }
}
