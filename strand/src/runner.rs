//! Start operations.
//!
//! A [`Runner`] carries one immutable [`Config`] and starts routines on the
//! event loop of the current thread. The crate-level functions
//! ([`run`], [`run_with`], [`spawn`], [`wrap`], [`wrap_all`]) use the default
//! configuration.

use crate::completion::{Callback, Completion};
use crate::config::Config;
use crate::driver::Driver;
use crate::error::Error;
use crate::promise::Promise;
use crate::routine::{Args, Receiver, Routine, RoutineFn, RoutineSource};
use crate::runtime::{EventLoop, context};
use crate::suspension::Suspension;
use crate::value::{Outcome, Value};

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

/// What a start operation hands back.
#[derive(Debug)]
pub enum Launch {
    /// Settles with the final outcome of the run.
    Promise(Promise),
    /// The outcome goes to the terminal callback given at start.
    Callback,
    /// Nothing observes the run.
    Detached,
}

impl Launch {
    pub fn promise(&self) -> Option<&Promise> {
        match self {
            Launch::Promise(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_promise(self) -> Option<Promise> {
        match self {
            Launch::Promise(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Launch> for Suspension {
    /// A launched promise is a future-like suspension; anything else is a
    /// plain null.
    fn from(launch: Launch) -> Self {
        match launch {
            Launch::Promise(p) => Suspension::from(p),
            Launch::Callback | Launch::Detached => Suspension::Value(Value::Null),
        }
    }
}

/// Starts routines with a fixed configuration.
///
/// # Examples
///
/// ```rust,ignore
/// let runner = Runner::new(Config::builder().prepend_continuation(true).build());
/// let launch = runner.run(my_routine, [1, 2])?;
/// ```
#[derive(Clone, Default)]
pub struct Runner {
    config: Rc<Config>,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        Self {
            config: Rc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts `routine` and returns a promise of its final outcome.
    ///
    /// Without a future constructor the run is detached and errors escape as
    /// [`Error::Unobserved`], synchronously when they happen before the first
    /// suspension.
    pub fn run(
        &self,
        routine: impl Into<RoutineSource>,
        args: impl Into<Args>,
    ) -> Result<Launch, Error> {
        self.start(routine.into(), args.into(), None)
    }

    /// Starts `routine` and delivers its final outcome to `callback`.
    pub fn run_with(
        &self,
        routine: impl Into<RoutineSource>,
        args: impl Into<Args>,
        callback: impl Into<Callback>,
    ) -> Result<Launch, Error> {
        self.start(routine.into(), args.into(), Some(callback.into()))
    }

    /// Starts `routine` with nobody observing it.
    pub fn spawn(
        &self,
        routine: impl Into<RoutineSource>,
        args: impl Into<Args>,
    ) -> Result<(), Error> {
        let event_loop = context::current().ok_or(Error::NoEventLoop)?;
        Driver::launch(
            event_loop,
            self.config.clone(),
            routine.into(),
            args.into(),
            Completion::Unobserved,
        )
    }

    fn start(
        &self,
        source: RoutineSource,
        args: Args,
        callback: Option<Callback>,
    ) -> Result<Launch, Error> {
        let event_loop = context::current().ok_or(Error::NoEventLoop)?;

        let (completion, launch) = match (callback, self.config.future_constructor()) {
            (Some(cb), _) => (Completion::Callback(cb), Launch::Callback),
            (None, Some(make)) => {
                let (promise, deferred) = make();
                (Completion::Future(deferred), Launch::Promise(promise))
            }
            (None, None) => (Completion::Unobserved, Launch::Detached),
        };

        Driver::launch(event_loop, self.config.clone(), source, args, completion)?;
        Ok(launch)
    }

    /// Turns `routine` into a reusable start function.
    pub fn wrap(&self, routine: impl Into<RoutineSource>) -> Wrapped {
        Wrapped {
            routine: RoutineFn::from(routine.into()),
            runner: self.clone(),
            receiver: None,
        }
    }

    /// Replaces every routine entry of `registry` with its wrapped form.
    ///
    /// Other entries are left untouched.
    pub fn wrap_all<'r>(&self, registry: &'r mut Registry) -> &'r mut Registry {
        for entry in registry.entries.values_mut() {
            *entry = match mem::replace(entry, Entry::Value(Value::Null)) {
                Entry::Routine(f) => Entry::Wrapped(self.wrap(f)),
                Entry::Instance(r) => Entry::Wrapped(self.wrap(RoutineSource::Instance(r))),
                other => other,
            };
        }
        registry
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish()
    }
}

/// A routine bound to a runner, callable any number of times.
#[derive(Clone)]
pub struct Wrapped {
    routine: RoutineFn,
    runner: Runner,
    receiver: Option<Receiver>,
}

impl Wrapped {
    /// Returns a copy that passes `receiver` to every invocation.
    pub fn bind(&self, receiver: Receiver) -> Wrapped {
        Wrapped {
            receiver: Some(receiver),
            ..self.clone()
        }
    }

    /// Starts a new run, like [`Runner::run`].
    pub fn call(&self, args: impl Into<Args>) -> Result<Launch, Error> {
        self.runner.run(&self.routine, self.args(args.into()))
    }

    /// Starts a new run, like [`Runner::run_with`].
    pub fn call_with(
        &self,
        args: impl Into<Args>,
        callback: impl Into<Callback>,
    ) -> Result<Launch, Error> {
        self.runner
            .run_with(&self.routine, self.args(args.into()), callback)
    }

    pub fn routine(&self) -> &RoutineFn {
        &self.routine
    }

    fn args(&self, args: Args) -> Args {
        match (&self.receiver, args.receiver()) {
            (Some(receiver), None) => args.with_receiver(receiver.clone()),
            _ => args,
        }
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("bound", &self.receiver.is_some())
            .finish()
    }
}

/// One member of a [`Registry`].
pub enum Entry {
    Routine(RoutineFn),
    Instance(Box<dyn Routine>),
    Wrapped(Wrapped),
    Value(Value),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Routine(_) => f.write_str("Routine"),
            Entry::Instance(_) => f.write_str("Instance"),
            Entry::Wrapped(w) => w.fmt(f),
            Entry::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// A named collection of members, in insertion order.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(name.into(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// The wrapped start function registered under `name`.
    pub fn wrapped(&self, name: &str) -> Option<&Wrapped> {
        match self.entries.get(name)? {
            Entry::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Starts `routine` with the default configuration. See [`Runner::run`].
pub fn run(routine: impl Into<RoutineSource>, args: impl Into<Args>) -> Result<Launch, Error> {
    Runner::default().run(routine, args)
}

/// See [`Runner::run_with`].
pub fn run_with(
    routine: impl Into<RoutineSource>,
    args: impl Into<Args>,
    callback: impl Into<Callback>,
) -> Result<Launch, Error> {
    Runner::default().run_with(routine, args, callback)
}

/// See [`Runner::spawn`].
pub fn spawn(routine: impl Into<RoutineSource>, args: impl Into<Args>) -> Result<(), Error> {
    Runner::default().spawn(routine, args)
}

/// See [`Runner::wrap`].
pub fn wrap(routine: impl Into<RoutineSource>) -> Wrapped {
    Runner::default().wrap(routine)
}

/// See [`Runner::wrap_all`].
pub fn wrap_all(registry: &mut Registry) -> &mut Registry {
    Runner::default().wrap_all(registry)
}

/// Runs `routine` to completion on a fresh event loop.
///
/// Returns the final outcome, or [`Error::Incomplete`] when the loop ran out
/// of work before the routine finished.
///
/// # Examples
///
/// ```rust,ignore
/// let outcome = strand::block_on(my_routine, ());
/// ```
pub fn block_on(routine: impl Into<RoutineSource>, args: impl Into<Args>) -> Outcome {
    let event_loop = EventLoop::new();
    let result: Rc<RefCell<Option<Outcome>>> = Rc::default();

    let sink = result.clone();
    let source = routine.into();
    let args = args.into();

    event_loop.block_on(move || {
        run_with(source, args, move |outcome: Outcome| {
            *sink.borrow_mut() = Some(outcome);
        })
    })??;

    result.take().unwrap_or(Err(Error::Incomplete))
}
