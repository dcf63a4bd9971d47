/// Task is idle and not scheduled.
///
/// The task exists but is waiting on a waker.
pub(crate) const IDLE: usize = 0;

/// Task is queued for polling.
///
/// Its index sits in the loop's ready queue exactly once.
pub(crate) const QUEUED: usize = 1;

/// Task is currently being polled by the loop.
pub(crate) const RUNNING: usize = 2;

/// Task has completed execution.
///
/// The future has returned `Poll::Ready` and will not be polled again;
/// late wake-ups are ignored.
pub(crate) const COMPLETED: usize = 3;

/// Task has been woken while being polled.
///
/// It is moved back to the ready queue once the current poll returns.
pub(crate) const NOTIFIED: usize = 4;
