use super::context::enter_context;
use super::task::state::{COMPLETED, IDLE, QUEUED, RUNNING};
use super::task::waker::{ReadyQueue, TaskWaker, make_waker};
use super::task::{LocalFuture, LocalTask};
use super::timer::{Timer, TimerEntry};
use crate::error::Error;
use crate::utils::Slab;

use std::cell::{Cell, RefCell};
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};
use std::thread;
use std::time::Instant;

/// A deferred unit of work on the run queue.
///
/// A job returning `Err` aborts [`EventLoop::run`]; this is how failures of
/// unobserved routines escape instead of being swallowed.
pub(crate) type Job = Box<dyn FnOnce() -> Result<(), Error>>;

/// Shared state of one event loop.
struct Inner {
    /// FIFO run queue. Resumptions are always appended to the back.
    queue: RefCell<VecDeque<Job>>,

    /// Pending timers, earliest deadline first.
    timers: RefCell<BinaryHeap<TimerEntry>>,

    /// Local futures, keyed by the index their wakers carry.
    tasks: RefCell<Slab<LocalTask>>,

    /// Indices of tasks that were woken.
    ready: ReadyQueue,

    /// Monotonic counter for timer ordering and driver identifiers.
    sequence: Cell<u64>,
}

/// Cheap, clonable handle to an event loop.
///
/// Drivers, continuation handles and timers keep one to post work back onto
/// the loop that started them.
#[derive(Clone)]
pub(crate) struct LoopHandle {
    inner: Rc<Inner>,
}

impl LoopHandle {
    fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(VecDeque::new()),
                timers: RefCell::new(BinaryHeap::new()),
                tasks: RefCell::new(Slab::new(16)),
                ready: ReadyQueue::default(),
                sequence: Cell::new(0),
            }),
        }
    }

    /// Returns a fresh, loop-unique identifier.
    pub(crate) fn next_id(&self) -> u64 {
        let id = self.inner.sequence.get();
        self.inner.sequence.set(id + 1);
        id
    }

    /// Appends a job to the back of the run queue.
    pub(crate) fn defer(&self, job: Job) {
        self.inner.queue.borrow_mut().push_back(job);
    }

    /// Registers a callback to run once `deadline` has passed.
    pub(crate) fn add_timer(&self, deadline: Instant, callback: Box<dyn FnOnce()>) -> Timer {
        let cancelled = Rc::new(Cell::new(false));

        let entry = TimerEntry {
            deadline,
            sequence: self.next_id(),
            callback,
            cancelled: cancelled.clone(),
        };
        self.inner.timers.borrow_mut().push(entry);

        Timer { cancelled }
    }

    /// Stores a local future and queues it for its first poll.
    pub(crate) fn spawn(&self, future: LocalFuture) {
        let ready = self.inner.ready.clone();

        let id = self.inner.tasks.borrow_mut().insert_with(|id| LocalTask {
            future: Some(future),
            waker: TaskWaker::new(id, ready),
        });

        self.inner.ready.lock().push_back(id);
    }

    /// Returns `true` when no job, timer or task is left.
    pub(crate) fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
            && self.inner.timers.borrow().is_empty()
            && self.inner.tasks.borrow().is_empty()
    }

    /// Drives the loop until it runs out of work.
    ///
    /// # Execution loop
    ///
    /// - Drain the run queue, including jobs appended while draining
    /// - Otherwise, poll every woken local task
    /// - Otherwise, fire due timers, sleeping until the earliest deadline
    /// - Otherwise, return
    ///
    /// Local tasks that are pending without a timer or a queued job to wake
    /// them are abandoned when the loop returns.
    pub(crate) fn run(&self) -> Result<(), Error> {
        loop {
            while let Some(job) = self.pop_job() {
                job()?;
            }

            let ready: Vec<usize> = self.inner.ready.lock().drain(..).collect();
            if !ready.is_empty() {
                for id in ready {
                    self.poll_task(id);
                }
                continue;
            }

            let Some(deadline) = self.next_deadline() else {
                tracing::trace!("event loop idle");
                return Ok(());
            };

            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }

            self.fire_due_timers();
        }
    }

    fn pop_job(&self) -> Option<Job> {
        self.inner.queue.borrow_mut().pop_front()
    }

    /// Earliest live deadline, discarding cancelled timers on the way.
    fn next_deadline(&self) -> Option<Instant> {
        let mut timers = self.inner.timers.borrow_mut();

        while let Some(top) = timers.peek() {
            if !top.cancelled.get() {
                return Some(top.deadline);
            }
            timers.pop();
        }

        None
    }

    fn fire_due_timers(&self) {
        let now = Instant::now();

        loop {
            let entry = {
                let mut timers = self.inner.timers.borrow_mut();
                match timers.peek() {
                    Some(top) if top.deadline <= now => timers.pop(),
                    _ => None,
                }
            };

            let Some(entry) = entry else {
                break;
            };

            if !entry.cancelled.get() {
                (entry.callback)();
            }
        }
    }

    /// Polls one local task.
    ///
    /// Follows the task state machine: `QUEUED -> RUNNING`, then either
    /// `COMPLETED` (slot released) or back to `IDLE`, re-queueing if the task
    /// was notified during its own poll.
    fn poll_task(&self, id: usize) {
        let (future, waker) = {
            let mut tasks = self.inner.tasks.borrow_mut();
            let Some(slot) = tasks.get_mut(id) else {
                return;
            };
            (slot.future.take(), slot.waker.clone())
        };

        let Some(mut future) = future else {
            return;
        };

        if waker
            .state
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.restore(id, future);
            return;
        }

        let task_waker = make_waker(waker.clone());
        let mut cx = Context::from_waker(&task_waker);

        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                waker.state.store(COMPLETED, Ordering::Release);
                self.inner.tasks.borrow_mut().remove(id);
            }
            Poll::Pending => {
                self.restore(id, future);

                if waker
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // Woken while running.
                    waker.requeue();
                }
            }
        }
    }

    fn restore(&self, id: usize, future: LocalFuture) {
        if let Some(slot) = self.inner.tasks.borrow_mut().get_mut(id) {
            slot.future = Some(future);
        }
    }

    /// Drops every pending job, timer and task.
    ///
    /// Queued jobs hold drivers, and drivers hold this handle; clearing the
    /// containers breaks those cycles. Items are dropped outside of the
    /// borrows since their destructors may touch the loop again.
    fn shutdown(&self) {
        let queue = std::mem::take(&mut *self.inner.queue.borrow_mut());
        let timers = std::mem::take(&mut *self.inner.timers.borrow_mut());
        let tasks = std::mem::take(&mut *self.inner.tasks.borrow_mut());
        self.inner.ready.lock().clear();

        drop(queue);
        drop(timers);
        drop(tasks);
    }
}

/// A single-threaded cooperative event loop.
///
/// `EventLoop` is responsible for:
/// - running deferred resumptions in strict FIFO order,
/// - firing timers,
/// - polling local futures spawned with [`spawn_local`](crate::task::spawn_local),
/// - providing the context every start operation looks up.
///
/// Dropping the loop discards whatever work is still pending; there is no
/// cancellation of individual routines.
pub struct EventLoop {
    handle: LoopHandle,
}

impl EventLoop {
    /// Creates an empty event loop.
    pub fn new() -> Self {
        Self {
            handle: LoopHandle::new(),
        }
    }

    /// Runs `f` with this loop installed as the current one.
    ///
    /// Start operations invoked inside `f` attach to this loop, but nothing is
    /// driven until [`run`](Self::run) is called.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        enter_context(self.handle.clone(), f)
    }

    /// Drives the loop until no job, woken task or timer is left.
    ///
    /// # Errors
    ///
    /// Returns the first failure of a run that had no way to report it
    /// ([`Error::Unobserved`]). Remaining work stays queued, so the loop may
    /// be run again.
    pub fn run(&self) -> Result<(), Error> {
        enter_context(self.handle.clone(), || self.handle.run())
    }

    /// Calls `f` inside the loop context, then runs the loop to completion.
    ///
    /// This is the synchronous entry point used by `main` functions and tests.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let event_loop = EventLoop::new();
    /// let launch = event_loop.block_on(|| strand::run(routine, ["D7"]))?;
    /// ```
    pub fn block_on<R>(&self, f: impl FnOnce() -> R) -> Result<R, Error> {
        let out = self.enter(f);
        self.run()?;
        Ok(out)
    }

    /// Returns `true` when the loop has nothing left to do.
    pub fn is_idle(&self) -> bool {
        self.handle.is_idle()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    /// Discards pending work so the drivers it references are released.
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}
