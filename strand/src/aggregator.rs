//! Parallel aggregation of callback-style operations.
//!
//! A routine reserves slots with [`Next::push`](crate::Next::push), hands each
//! slot to an independent operation, then pauses on
//! [`Next::all`](crate::Next::all) or [`Next::any`](crate::Next::any). The
//! slots of one queue form a *round*; taking the round for a wait starts a
//! fresh queue.

use crate::completion::Callback;
use crate::continuation::Next;
use crate::error::Error;
use crate::suspension::Suspension;
use crate::value::{Outcome, Value};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

enum SlotState {
    Pending,
    Resolved(Value),
    Failed,
}

enum Waiter {
    All(Next),
    Any(Next),
}

impl Waiter {
    fn into_next(self) -> Next {
        match self {
            Waiter::All(next) | Waiter::Any(next) => next,
        }
    }
}

#[derive(Default)]
pub(crate) struct Round {
    /// One entry per slot, in push order.
    slots: Vec<SlotState>,
    first_success: Option<Value>,
    first_failure: Option<Error>,
    waiter: Option<Waiter>,
    settled: bool,
    discarded: bool,
}

type RoundRef = Rc<RefCell<Round>>;

impl Round {
    /// Settles the waiter if the round has an answer, returning the handle
    /// to invoke once the round is no longer borrowed.
    fn decide(&mut self) -> Option<(Next, Outcome)> {
        if self.settled {
            return None;
        }

        let outcome = match self.waiter.as_ref()? {
            Waiter::All(_) => self.all_outcome()?,
            Waiter::Any(_) => self.any_outcome()?,
        };

        self.settled = true;
        let next = self.waiter.take()?.into_next();
        Some((next, outcome))
    }

    fn all_outcome(&self) -> Option<Outcome> {
        if let Some(err) = &self.first_failure {
            return Some(Err(err.clone()));
        }

        self.slots
            .iter()
            .map(|slot| match slot {
                SlotState::Resolved(v) => Some(v.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(|values| Ok(Value::List(values)))
    }

    fn any_outcome(&self) -> Option<Outcome> {
        if let Some(v) = &self.first_success {
            return Some(Ok(v.clone()));
        }

        if self.slots.is_empty() {
            return Some(Ok(Value::Null));
        }

        if self.slots.iter().all(|slot| matches!(slot, SlotState::Failed)) {
            return Some(Err(self.first_failure.clone().unwrap_or(Error::Rejected)));
        }

        None
    }
}

/// Per-driver aggregation queue.
#[derive(Default)]
pub(crate) struct Aggregator {
    round: Option<RoundRef>,
}

impl Aggregator {
    pub(crate) fn push(&mut self) -> Slot {
        let round = self.round.get_or_insert_with(RoundRef::default).clone();

        let index = {
            let mut r = round.borrow_mut();
            r.slots.push(SlotState::Pending);
            r.slots.len() - 1
        };

        trace!(slot = index, "aggregation slot reserved");
        Slot { round, index }
    }

    /// Takes the current round, leaving a fresh queue behind.
    pub(crate) fn take(&mut self) -> RoundRef {
        self.round.take().unwrap_or_default()
    }

    pub(crate) fn clear(&mut self) {
        if let Some(round) = self.round.take() {
            round.borrow_mut().discarded = true;
        }
    }
}

pub(crate) fn all(round: RoundRef) -> Suspension {
    Suspension::thunk(move |next| wait(&round, Waiter::All(next)))
}

pub(crate) fn any(round: RoundRef) -> Suspension {
    Suspension::thunk(move |next| wait(&round, Waiter::Any(next)))
}

fn wait(round: &RoundRef, waiter: Waiter) {
    let decision = {
        let mut r = round.borrow_mut();
        r.waiter = Some(waiter);
        r.decide()
    };

    if let Some((next, outcome)) = decision {
        next.settle(outcome);
    }
}

/// A reserved position in an aggregation round.
///
/// A slot records one outcome. Later calls on the same slot, calls after
/// the round settled, and calls on a discarded round are ignored.
#[derive(Clone)]
pub struct Slot {
    round: RoundRef,
    index: usize,
}

impl Slot {
    /// Position of the slot in its round.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn resolve(&self, value: impl Into<Value>) {
        self.record(Ok(value.into()));
    }

    pub fn reject(&self, err: Error) {
        self.record(Err(err));
    }

    pub fn settle(&self, outcome: Outcome) {
        self.record(outcome);
    }

    /// Callback-shaped invocation: an optional error, then values.
    pub fn call(&self, error: Option<Error>, values: Vec<Value>) {
        match error {
            Some(err) => self.reject(err),
            None => self.resolve(values.into_iter().next().unwrap_or_default()),
        }
    }

    fn record(&self, outcome: Outcome) {
        let decision = {
            let mut guard = self.round.borrow_mut();
            let round = &mut *guard;
            if round.discarded || round.settled {
                trace!(slot = self.index, "late aggregation outcome dropped");
                return;
            }

            let Some(state) = round.slots.get_mut(self.index) else {
                return;
            };
            if !matches!(state, SlotState::Pending) {
                return;
            }

            match outcome {
                Ok(v) => {
                    *state = SlotState::Resolved(v.clone());
                    round.first_success.get_or_insert(v);
                }
                Err(err) => {
                    *state = SlotState::Failed;
                    round.first_failure.get_or_insert(err);
                }
            }

            round.decide()
        };

        if let Some((next, outcome)) = decision {
            next.settle(outcome);
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("index", &self.index).finish()
    }
}

impl From<Slot> for Callback {
    fn from(slot: Slot) -> Self {
        Callback::new(move |outcome| slot.settle(outcome))
    }
}
