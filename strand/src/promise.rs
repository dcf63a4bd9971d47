//! Future-like values.
//!
//! A suspension of the *future* kind is anything implementing [`Thenable`]:
//! it accepts one success handler and one failure handler and calls exactly
//! one of them later. [`Promise`] is the crate's own implementation and the
//! type the start operation returns when no terminal callback is given.

use crate::error::Error;
use crate::runtime::task::spawn_local;
use crate::value::{Outcome, Value};

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Success handler registered on a [`Thenable`].
pub type OnFulfilled = Box<dyn FnOnce(Value)>;

/// Failure handler registered on a [`Thenable`].
///
/// `None` means the value rejected without a reason.
pub type OnRejected = Box<dyn FnOnce(Option<Error>)>;

/// Builds the promise returned by a start operation.
pub type PromiseFactory = fn() -> (Promise, Deferred);

/// The continuation-registration contract of future-like values.
pub trait Thenable {
    /// Registers the handlers. Exactly one of them is invoked, once.
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled, on_rejected: OnRejected);
}

enum State {
    Pending {
        handlers: Vec<(OnFulfilled, OnRejected)>,
        wakers: Vec<Waker>,
    },
    Fulfilled(Value),
    Rejected(Option<Error>),
}

/// A single-threaded, settle-once promise.
///
/// Clones share the same state. A promise registered as a suspension hands
/// its outcome to the continuation handle; it can also be `.await`ed from a
/// local task, in which case a reason-less rejection surfaces as
/// [`Error::Rejected`].
#[derive(Clone)]
pub struct Promise {
    state: Rc<RefCell<State>>,
}

/// The settling side of a [`Promise`].
///
/// Only the first settlement counts; later calls are ignored.
#[derive(Clone)]
pub struct Deferred {
    state: Rc<RefCell<State>>,
}

impl Promise {
    /// Creates a pending promise together with its settling side.
    pub fn pending() -> (Promise, Deferred) {
        let state = Rc::new(RefCell::new(State::Pending {
            handlers: Vec::new(),
            wakers: Vec::new(),
        }));

        (
            Promise {
                state: state.clone(),
            },
            Deferred { state },
        )
    }

    pub fn resolved(value: impl Into<Value>) -> Promise {
        Promise {
            state: Rc::new(RefCell::new(State::Fulfilled(value.into()))),
        }
    }

    pub fn rejected(err: Error) -> Promise {
        Promise {
            state: Rc::new(RefCell::new(State::Rejected(Some(err)))),
        }
    }

    /// A promise rejected without a reason.
    pub fn rejected_empty() -> Promise {
        Promise {
            state: Rc::new(RefCell::new(State::Rejected(None))),
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(&*self.state.borrow(), State::Pending { .. })
    }

    /// Returns the outcome if the promise has settled.
    pub fn peek(&self) -> Option<Outcome> {
        match &*self.state.borrow() {
            State::Pending { .. } => None,
            State::Fulfilled(v) => Some(Ok(v.clone())),
            State::Rejected(e) => Some(Err(e.clone().unwrap_or(Error::Rejected))),
        }
    }

    /// Registers handlers, invoking one immediately if already settled.
    pub fn on_settle(&self, on_fulfilled: OnFulfilled, on_rejected: OnRejected) {
        let settled = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Pending { handlers, .. } => {
                    handlers.push((on_fulfilled, on_rejected));
                    return;
                }
                State::Fulfilled(v) => Ok(v.clone()),
                State::Rejected(e) => Err(e.clone()),
            }
        };

        match settled {
            Ok(v) => on_fulfilled(v),
            Err(e) => on_rejected(e),
        }
    }
}

impl State {
    fn label(&self) -> &'static str {
        match self {
            State::Pending { .. } => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state.borrow().label())
            .finish()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state.borrow().label())
            .finish()
    }
}

impl Deferred {
    pub fn resolve(&self, value: impl Into<Value>) {
        self.finish(State::Fulfilled(value.into()));
    }

    pub fn reject(&self, err: Error) {
        self.finish(State::Rejected(Some(err)));
    }

    /// Rejects without a reason.
    pub fn reject_empty(&self) {
        self.finish(State::Rejected(None));
    }

    pub fn settle(&self, outcome: Outcome) {
        match outcome {
            Ok(v) => self.resolve(v),
            Err(e) => self.reject(e),
        }
    }

    fn finish(&self, settled: State) {
        let (handlers, wakers) = {
            let mut state = self.state.borrow_mut();
            if !matches!(&*state, State::Pending { .. }) {
                return;
            }

            match mem::replace(&mut *state, settled) {
                State::Pending { handlers, wakers } => (handlers, wakers),
                _ => return,
            }
        };

        let outcome = match &*self.state.borrow() {
            State::Fulfilled(v) => Ok(v.clone()),
            State::Rejected(e) => Err(e.clone()),
            State::Pending { .. } => return,
        };

        for (on_fulfilled, on_rejected) in handlers {
            match &outcome {
                Ok(v) => on_fulfilled(v.clone()),
                Err(e) => on_rejected(e.clone()),
            }
        }

        for waker in wakers {
            waker.wake();
        }
    }
}

impl Thenable for Promise {
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled, on_rejected: OnRejected) {
        self.on_settle(on_fulfilled, on_rejected);
    }
}

impl Future for Promise {
    type Output = Outcome;

    /// Polls the promise.
    ///
    /// The waker is stored while pending and woken on settlement.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        let mut state = self.state.borrow_mut();

        match &mut *state {
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
            State::Fulfilled(v) => Poll::Ready(Ok(v.clone())),
            State::Rejected(e) => Poll::Ready(Err(e.clone().unwrap_or(Error::Rejected))),
        }
    }
}

/// A Rust future used as a suspension.
///
/// The future is spawned as a local task only when the resolver registers its
/// handlers, so building the suspension outside of a loop is fine.
pub(crate) struct LocalThenable<F> {
    pub(crate) future: F,
}

impl<F> Thenable for LocalThenable<F>
where
    F: Future<Output = Outcome> + 'static,
{
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled, on_rejected: OnRejected) {
        spawn_local(self.future).on_settle(on_fulfilled, on_rejected);
    }
}
