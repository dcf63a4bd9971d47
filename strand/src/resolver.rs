//! Maps suspension values onto continuation-handle invocations.

use crate::completion::Completion;
use crate::config::Config;
use crate::continuation::Next;
use crate::driver::Driver;
use crate::error::Error;
use crate::routine::{Args, Receiver};
use crate::runtime::LoopHandle;
use crate::stream::{Disposer, Subscribable};
use crate::suspension::Suspension;
use crate::value::Value;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{trace, warn};

pub(crate) enum Resolution {
    /// The handle will be invoked by whatever took charge of the value.
    Handled,
    /// Nothing recognized the value.
    Unhandled(Value),
}

pub(crate) struct Resolver<'a> {
    config: &'a Rc<Config>,
    receiver: Option<&'a Receiver>,
    event_loop: &'a LoopHandle,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        config: &'a Rc<Config>,
        receiver: Option<&'a Receiver>,
        event_loop: &'a LoopHandle,
    ) -> Self {
        Self {
            config,
            receiver,
            event_loop,
        }
    }

    pub(crate) fn resolve(&self, suspension: Suspension, next: Next) -> Result<Resolution, Error> {
        match suspension {
            Suspension::Future(thenable) => {
                let on_ok = next.clone();
                thenable.then(
                    Box::new(move |value| on_ok.resolve(value)),
                    Box::new(move |err| next.reject(err.unwrap_or(Error::Rejected))),
                );
                Ok(Resolution::Handled)
            }
            Suspension::Routine(source) => {
                let mut args = Args::new();
                if let Some(receiver) = self.receiver {
                    args = args.with_receiver(receiver.clone());
                }

                Driver::launch(
                    self.event_loop.clone(),
                    self.config.clone(),
                    source,
                    args,
                    Completion::Callback(next.into()),
                )?;
                Ok(Resolution::Handled)
            }
            Suspension::Thunk(thunk) => {
                thunk(next);
                Ok(Resolution::Handled)
            }
            Suspension::Stream(stream) => {
                first_event(stream, next);
                Ok(Resolution::Handled)
            }
            Suspension::Value(value) => match self.custom(Box::new(value), next) {
                Ok(()) => Ok(Resolution::Handled),
                Err(payload) => match payload.downcast::<Value>() {
                    Ok(value) => Ok(Resolution::Unhandled(*value)),
                    Err(_) => Ok(Resolution::Unhandled(Value::Null)),
                },
            },
            Suspension::Other(payload) => match self.custom(payload, next) {
                Ok(()) => Ok(Resolution::Handled),
                Err(_) => {
                    warn!("opaque suspension left unresolved, treating it as null");
                    Ok(Resolution::Unhandled(Value::Null))
                }
            },
        }
    }

    fn custom(&self, payload: Box<dyn Any>, next: Next) -> Result<(), Box<dyn Any>> {
        match self.config.custom_yieldable() {
            Some(hook) => hook(payload, next),
            None => Err(payload),
        }
    }
}

/// Settles `next` with the first event of `stream`, then unsubscribes.
fn first_event(stream: Box<dyn Subscribable>, next: Next) {
    let settled = Rc::new(Cell::new(false));
    let disposer: Rc<RefCell<Option<Disposer>>> = Rc::default();

    let on_next = {
        let (settled, disposer, next) = (settled.clone(), disposer.clone(), next.clone());
        Box::new(move |value: Value| {
            if settled.replace(true) {
                return;
            }
            next.resolve(value);
            release(&disposer);
        })
    };

    let on_error = {
        let (settled, disposer) = (settled.clone(), disposer.clone());
        Box::new(move |err: Error| {
            if settled.replace(true) {
                return;
            }
            next.reject(err);
            release(&disposer);
        })
    };

    let subscription = stream.subscribe(on_next, on_error);

    if settled.get() {
        // The stream emitted from inside `subscribe`.
        trace!("stream settled during subscription");
        subscription.dispose();
    } else {
        *disposer.borrow_mut() = Some(subscription);
    }
}

fn release(disposer: &RefCell<Option<Disposer>>) {
    let subscription = disposer.borrow_mut().take();
    if let Some(subscription) = subscription {
        subscription.dispose();
    }
}
