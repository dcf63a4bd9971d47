use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::Instant;

/// An entry in the event loop timer queue.
///
/// `TimerEntry` represents a callback scheduled at a specific deadline. It is
/// stored inside a binary heap ordered by deadline, then by insertion
/// sequence so timers sharing a deadline fire in registration order.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Registration order, breaking ties between equal deadlines.
    pub(crate) sequence: u64,

    /// Callback invoked when the deadline is reached.
    pub(crate) callback: Box<dyn FnOnce()>,

    /// Cancellation flag shared with the [`Timer`] handle.
    pub(crate) cancelled: Rc<Cell<bool>>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then sequence.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap, where the earliest
    /// deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Handle to a scheduled timer.
///
/// Dropping the handle does **not** cancel the timer; call
/// [`cancel`](Self::cancel) for that.
#[derive(Debug, Clone)]
pub struct Timer {
    pub(crate) cancelled: Rc<Cell<bool>>,
}

impl Timer {
    /// Prevents the timer from firing. Has no effect once it has fired.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}
