//! Subscribable streams.
//!
//! A suspension of the *stream* kind observes only the first event: the
//! first emitted value or failure settles the continuation, and the
//! subscription is disposed right away.

use crate::error::Error;
use crate::value::Value;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handler for emitted values.
pub type OnNext = Box<dyn FnMut(Value)>;

/// Handler for stream failures.
pub type OnError = Box<dyn FnMut(Error)>;

/// The subscribe contract of stream-like values.
pub trait Subscribable {
    /// Subscribes the handlers and returns the means to unsubscribe.
    ///
    /// Implementations may emit synchronously from inside `subscribe`.
    fn subscribe(self: Box<Self>, on_next: OnNext, on_error: OnError) -> Disposer;
}

/// Tears a subscription down.
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn dispose(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

struct Subscriber {
    id: u64,
    active: Rc<Cell<bool>>,
    on_next: Rc<RefCell<OnNext>>,
    on_error: Rc<RefCell<OnError>>,
}

#[derive(Default)]
struct Channel {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// A multicast stream that emits to every live subscriber.
///
/// Clones share the same subscriber list.
///
/// # Examples
///
/// ```rust,ignore
/// let clicks = Subject::new();
/// let value = co.suspend(Suspension::stream(clicks.clone())).await?;
/// ```
#[derive(Clone, Default)]
pub struct Subject {
    channel: Rc<RefCell<Channel>>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.channel.borrow().subscribers.len()
    }

    /// Emits a value to every subscriber registered at the time of the call.
    pub fn emit(&self, value: impl Into<Value>) {
        let value = value.into();

        for (active, on_next) in self.snapshot(|s| s.on_next.clone()) {
            if active.get() {
                (*on_next.borrow_mut())(value.clone());
            }
        }
    }

    /// Emits a failure to every subscriber registered at the time of the call.
    pub fn fail(&self, err: Error) {
        for (active, on_error) in self.snapshot(|s| s.on_error.clone()) {
            if active.get() {
                (*on_error.borrow_mut())(err.clone());
            }
        }
    }

    /// Copies out the handlers so they run without the channel borrowed;
    /// a handler may dispose its own subscription.
    fn snapshot<H>(&self, pick: impl Fn(&Subscriber) -> H) -> Vec<(Rc<Cell<bool>>, H)> {
        self.channel
            .borrow()
            .subscribers
            .iter()
            .map(|s| (s.active.clone(), pick(s)))
            .collect()
    }
}

impl Subscribable for Subject {
    fn subscribe(self: Box<Self>, on_next: OnNext, on_error: OnError) -> Disposer {
        let active = Rc::new(Cell::new(true));

        let id = {
            let mut channel = self.channel.borrow_mut();
            let id = channel.next_id;
            channel.next_id += 1;
            channel.subscribers.push(Subscriber {
                id,
                active: active.clone(),
                on_next: Rc::new(RefCell::new(on_next)),
                on_error: Rc::new(RefCell::new(on_error)),
            });
            id
        };

        let channel = self.channel.clone();
        Disposer::new(move || {
            active.set(false);
            channel.borrow_mut().subscribers.retain(|s| s.id != id);
        })
    }
}
