//! The per-routine state machine.
//!
//! A driver owns exactly one routine instance. It resumes the routine, hands
//! each yielded suspension to the resolver and, once the routine is done,
//! delivers the final outcome to the run's completion.
//!
//! The routine is taken out of the driver for the duration of each resume,
//! so user code never runs while the driver is borrowed and may freely call
//! back into it through the continuation handle.

use crate::aggregator::Aggregator;
use crate::completion::Completion;
use crate::config::Config;
use crate::continuation::{Next, Signal};
use crate::error::Error;
use crate::resolver::{Resolution, Resolver};
use crate::routine::{Args, Receiver, Resume, Routine, RoutineSource, Step};
use crate::runtime::LoopHandle;
use crate::suspension::Suspension;
use crate::value::Outcome;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Created, not resumed yet.
    Starting,
    /// Paused on a suspension, or waiting for its final value.
    Suspended,
    /// The routine is running.
    Resuming,
    Completed,
    Failed,
}

impl State {
    fn is_terminal(self) -> bool {
        matches!(self, State::Completed | State::Failed)
    }
}

struct Core {
    routine: Option<Box<dyn Routine>>,
    state: State,
    /// Incremented on every resume; scoped handles carry the value they were
    /// issued under.
    step: u64,
    /// Set once the continuation handle fired for the current step.
    used: bool,
    completion: Option<Completion>,
    aggregator: Aggregator,
}

pub(crate) struct Driver {
    id: u64,
    config: Rc<Config>,
    event_loop: LoopHandle,
    receiver: Option<Receiver>,
    core: RefCell<Core>,
}

impl Driver {
    /// Creates a driver for `source` and runs it up to its first suspension.
    ///
    /// Returns an error only for unobserved runs that fail synchronously.
    pub(crate) fn launch(
        event_loop: LoopHandle,
        config: Rc<Config>,
        source: RoutineSource,
        mut args: Args,
        completion: Completion,
    ) -> Result<(), Error> {
        let id = event_loop.next_id();
        debug!(
            driver = id,
            mode = completion.mode(),
            "launching routine"
        );

        let driver = Rc::new(Driver {
            id,
            receiver: args.receiver().cloned(),
            config,
            event_loop,
            core: RefCell::new(Core {
                routine: Some(source.into_routine()),
                state: State::Starting,
                step: 0,
                used: false,
                completion: Some(completion),
                aggregator: Aggregator::default(),
            }),
        });

        args.attach(Next::new(driver.clone()), driver.config.prepend_continuation());
        driver.advance(Resume::Start(args))
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    pub(crate) fn with_aggregator<R>(&self, f: impl FnOnce(&mut Aggregator) -> R) -> R {
        f(&mut self.core.borrow_mut().aggregator)
    }

    /// Records an invocation of the continuation handle.
    ///
    /// `step` is the step a scoped handle was issued for. A call from an
    /// earlier step counts as a second continuation of that step.
    pub(crate) fn signal(self: &Rc<Self>, step: Option<u64>, signal: Signal) {
        let mut core = self.core.borrow_mut();

        if core.state.is_terminal() {
            trace!(driver = self.id, "continuation after completion ignored");
            return;
        }

        let stale = step.is_some_and(|step| step != core.step);
        if stale {
            trace!(driver = self.id, step, current = core.step, "stale continuation");
        }

        if core.used || stale {
            drop(core);
            self.violate();
            return;
        }

        core.used = true;
        drop(core);

        let driver = self.clone();
        self.event_loop
            .defer(Box::new(move || driver.receive(signal)));
    }

    /// Resumes the routine with the outcome recorded for the finished step.
    fn receive(self: &Rc<Self>, signal: Signal) -> Result<(), Error> {
        let has_routine = {
            let mut core = self.core.borrow_mut();
            if core.state.is_terminal() {
                return Ok(());
            }
            core.used = false;
            core.routine.is_some()
        };

        if !has_routine {
            return self.finish(signal.into_outcome());
        }

        let input = if self.config.raw_mode() {
            Resume::Value(signal.into_raw())
        } else {
            match signal.into_outcome() {
                Ok(value) => Resume::Value(value),
                Err(err) => Resume::Throw(err),
            }
        };

        self.advance(input)
    }

    fn advance(self: &Rc<Self>, input: Resume) -> Result<(), Error> {
        let routine = {
            let mut core = self.core.borrow_mut();
            if core.state.is_terminal() {
                return Ok(());
            }
            core.state = State::Resuming;
            core.step += 1;
            core.routine.take()
        };

        let Some(mut routine) = routine else {
            return Ok(());
        };

        trace!(driver = self.id, input = input.kind(), "resuming routine");
        let step = routine.resume(input);

        {
            let mut core = self.core.borrow_mut();
            if core.state.is_terminal() {
                // Aborted while running, by a protocol violation.
                drop(core);
                drop(routine);
                return Ok(());
            }

            core.state = State::Suspended;
            if let Step::Yield(_) = &step {
                core.routine = Some(routine);
            }
        }

        match step {
            Step::Yield(suspension) => self.resolve(suspension, false),
            Step::Return(suspension) => self.resolve(suspension, true),
            Step::Raise(err) => self.finish(Err(err)),
        }
    }

    fn resolve(self: &Rc<Self>, suspension: Suspension, last: bool) -> Result<(), Error> {
        trace!(
            driver = self.id,
            kind = suspension.kind(),
            last,
            "resolving suspension"
        );

        let step = self.core.borrow().step;
        let next = Next::scoped(self.clone(), step);
        let resolver = Resolver::new(&self.config, self.receiver.as_ref(), &self.event_loop);

        match resolver.resolve(suspension, next)? {
            Resolution::Handled => Ok(()),
            Resolution::Unhandled(value) if last => self.finish(Ok(value)),
            Resolution::Unhandled(_) => {
                trace!(driver = self.id, "waiting for manual continuation");
                Ok(())
            }
        }
    }

    fn finish(&self, outcome: Outcome) -> Result<(), Error> {
        let (completion, routine) = {
            let mut core = self.core.borrow_mut();
            if core.state.is_terminal() {
                return Ok(());
            }
            core.state = if outcome.is_ok() {
                State::Completed
            } else {
                State::Failed
            };
            (core.completion.take(), core.routine.take())
        };
        drop(routine);

        debug!(driver = self.id, ok = outcome.is_ok(), "routine finished");

        match completion {
            Some(completion) => completion.deliver(outcome),
            None => Ok(()),
        }
    }

    /// Aborts the routine after a second continuation within one step.
    fn violate(self: &Rc<Self>) {
        warn!(driver = self.id, "multiple continuations within one step");

        if let Err(escaped) = self.finish(Err(Error::MultipleContinuations)) {
            self.event_loop.defer(Box::new(move || Err(escaped)));
        }
    }
}
