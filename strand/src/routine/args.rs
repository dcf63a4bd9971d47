use crate::continuation::Next;
use crate::value::Value;

use std::any::Any;
use std::rc::Rc;

/// Explicit receiver ("this") threaded through a run and its nested routines.
pub type Receiver = Rc<dyn Any>;

/// One invocation argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    /// The continuation handle attached by the driver.
    Next(Next),
}

/// Invocation arguments of a routine.
///
/// The driver attaches the continuation handle at the front or the back,
/// depending on [`Config::prepend_continuation`](crate::Config::prepend_continuation),
/// so a routine can rely on a fixed position.
#[derive(Debug, Clone, Default)]
pub struct Args {
    items: Vec<Arg>,
    receiver: Option<Receiver>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value argument.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(Arg::Value(value.into()));
    }

    /// Binds a receiver to the invocation.
    pub fn with_receiver(mut self, receiver: Receiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Argument at `index`, counting the continuation handle.
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.items.get(index)
    }

    /// Value argument at `index`, counting the continuation handle.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.items.get(index)? {
            Arg::Value(v) => Some(v),
            Arg::Next(_) => None,
        }
    }

    /// Value arguments in order, skipping the continuation handle.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().filter_map(|arg| match arg {
            Arg::Value(v) => Some(v),
            Arg::Next(_) => None,
        })
    }

    /// The continuation handle, if the driver attached one.
    pub fn next(&self) -> Option<Next> {
        self.items.iter().find_map(|arg| match arg {
            Arg::Next(next) => Some(next.clone()),
            Arg::Value(_) => None,
        })
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    /// Returns the receiver downcast to `T`.
    pub fn receiver_as<T: 'static>(&self) -> Option<Rc<T>> {
        self.receiver.clone()?.downcast::<T>().ok()
    }

    pub(crate) fn attach(&mut self, next: Next, prepend: bool) {
        if prepend {
            self.items.insert(0, Arg::Next(next));
        } else {
            self.items.push(Arg::Next(next));
        }
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::new()
    }
}

impl<V: Into<Value>> From<Vec<V>> for Args {
    fn from(values: Vec<V>) -> Self {
        Args {
            items: values.into_iter().map(|v| Arg::Value(v.into())).collect(),
            receiver: None,
        }
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Args {
    fn from(values: [V; N]) -> Self {
        Args::from(Vec::from(values))
    }
}
