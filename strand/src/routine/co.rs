use super::{Args, Resume, Routine, RoutineFn, Step};
use crate::error::Error;
use crate::suspension::Suspension;
use crate::value::{Outcome, Value};

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

type Body = Pin<Box<dyn Future<Output = Result<Suspension, Error>>>>;
type Start = Box<dyn FnOnce(Co, Args) -> Body>;

/// Shared between the routine body and the driver-facing adapter.
#[derive(Default)]
struct Exchange {
    /// Suspension handed out by the body, waiting to be picked up.
    yielded: Option<Suspension>,
    /// Outcome of the last suspension, waiting to be picked up by the body.
    resumed: Option<Outcome>,
}

/// Suspension handle passed to `async` routine bodies.
///
/// Clones refer to the same routine.
#[derive(Clone)]
pub struct Co {
    exchange: Rc<RefCell<Exchange>>,
}

impl Co {
    /// Pauses the routine on `suspension`.
    ///
    /// Resolves to the suspension's value, or to the error it failed with.
    /// The body is free to recover from the error or to propagate it with `?`.
    pub fn suspend(&self, suspension: impl Into<Suspension>) -> Suspend {
        Suspend {
            exchange: self.exchange.clone(),
            pending: Some(suspension.into()),
        }
    }

    /// Pauses until the continuation handle is invoked by hand.
    pub fn wait(&self) -> Suspend {
        self.suspend(Value::Null)
    }
}

/// Future returned by [`Co::suspend`].
pub struct Suspend {
    exchange: Rc<RefCell<Exchange>>,
    pending: Option<Suspension>,
}

impl Future for Suspend {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Outcome> {
        if let Some(suspension) = self.pending.take() {
            let mut exchange = self.exchange.borrow_mut();
            exchange.resumed = None;
            exchange.yielded = Some(suspension);
            return Poll::Pending;
        }

        match self.exchange.borrow_mut().resumed.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

/// Drives an `async` body as a [`Routine`].
///
/// The body is polled exactly once per resume; each poll runs it up to the
/// next `co.suspend(..).await`.
struct CoRoutine {
    start: Option<Start>,
    body: Option<Body>,
    co: Co,
}

impl CoRoutine {
    fn new(start: Start) -> Self {
        Self {
            start: Some(start),
            body: None,
            co: Co {
                exchange: Rc::default(),
            },
        }
    }

    fn poll_body(&mut self) -> Step {
        let Some(body) = self.body.as_mut() else {
            return Step::done(Value::Null);
        };

        let mut cx = Context::from_waker(Waker::noop());
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                self.body = None;
                match result {
                    Ok(suspension) => Step::Return(suspension),
                    Err(err) => Step::Raise(err),
                }
            }
            Poll::Pending => match self.co.exchange.borrow_mut().yielded.take() {
                Some(suspension) => Step::Yield(suspension),
                None => {
                    self.body = None;
                    Step::Raise(Error::Stalled)
                }
            },
        }
    }
}

impl Routine for CoRoutine {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Start(args) => {
                let Some(start) = self.start.take() else {
                    return Step::done(Value::Null);
                };
                self.body = Some(start(self.co.clone(), args));
            }
            Resume::Value(value) => {
                self.co.exchange.borrow_mut().resumed = Some(Ok(value));
            }
            Resume::Throw(err) => {
                if self.body.is_none() {
                    return Step::Raise(err);
                }
                self.co.exchange.borrow_mut().resumed = Some(Err(err));
            }
        }

        self.poll_body()
    }
}

/// Builds a routine factory from an `async` body.
///
/// Every call of the factory runs `body` afresh with its own [`Co`] handle.
/// The body must pause through `co.suspend(..)` only; awaiting anything else
/// that is not immediately ready makes the routine fail with
/// [`Error::Stalled`].
///
/// # Examples
///
/// ```rust,ignore
/// let add = strand::routine(|co: Co, args: Args| async move {
///     let a = co.suspend(Promise::resolved(1)).await?.expect_int()?;
///     Ok::<_, Error>(a + 1)
/// });
/// ```
pub fn routine<F, Fut, T>(body: F) -> RoutineFn
where
    F: Fn(Co, Args) -> Fut + 'static,
    Fut: Future<Output = Result<T, Error>> + 'static,
    T: Into<Suspension>,
{
    let body = Rc::new(body);

    RoutineFn::new(move || {
        let body = body.clone();
        let start: Start = Box::new(move |co, args| -> Body {
            let fut = (*body)(co, args);
            Box::pin(async move {
                let output: Result<Suspension, Error> = fut.await.map(Into::into);
                output
            })
        });
        Box::new(CoRoutine::new(start))
    })
}
