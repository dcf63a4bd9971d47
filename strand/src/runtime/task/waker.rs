use super::state::{IDLE, NOTIFIED, QUEUED, RUNNING};

use parking_lot::Mutex;

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Indices of local tasks that are ready to be polled.
///
/// Wakers are `Send + Sync` by contract, so this queue is shared behind a
/// lock even though the loop itself never leaves its thread.
pub(crate) type ReadyQueue = Arc<Mutex<VecDeque<usize>>>;

/// Wake-up bookkeeping for one local task.
///
/// The future itself lives in the loop's slab; the waker only knows the
/// slab index and the lifecycle state, which keeps it thread-safe.
pub(crate) struct TaskWaker {
    /// Slab index of the task.
    pub(crate) id: usize,

    /// The current lifecycle state (IDLE, QUEUED, RUNNING, ...).
    pub(crate) state: AtomicUsize,

    /// Ready queue of the owning loop.
    ready: ReadyQueue,
}

impl TaskWaker {
    /// Creates the bookkeeping for a freshly spawned task, already queued.
    pub(crate) fn new(id: usize, ready: ReadyQueue) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: AtomicUsize::new(QUEUED),
            ready,
        })
    }

    /// Signals the task to be polled again.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and its index is pushed to
    /// the ready queue. If it is `RUNNING`, it moves to `NOTIFIED` so the loop
    /// re-queues it right after the current poll.
    pub(crate) fn wake(&self) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.ready.lock().push_back(self.id);
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, notified or finished: nothing to do.
                _ => return,
            }
        }
    }

    /// Pushes the task index back onto the ready queue.
    pub(crate) fn requeue(&self) {
        self.state.store(QUEUED, Ordering::Release);
        self.ready.lock().push_back(self.id);
    }
}

/// Returns the `RawWakerVTable` for local tasks.
///
/// All functions in the vtable uphold the invariants required by
/// [`RawWaker`]: the data pointer always originates from `Arc::into_raw` on an
/// `Arc<TaskWaker>` and every clone/drop is balanced.
fn vtable() -> &'static RawWakerVTable {
    &RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw)
}

/// Creates a [`Waker`] that re-queues the given task when woken.
pub(crate) fn make_waker(task: Arc<TaskWaker>) -> Waker {
    unsafe { Waker::from_raw(RawWaker::new(Arc::into_raw(task) as *const (), vtable())) }
}

/// Clones the raw waker, incrementing the reference count.
fn clone_raw(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::<TaskWaker>::from_raw(ptr as *const TaskWaker) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable())
}

/// Wakes the task and consumes the waker.
fn wake_raw(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskWaker>::from_raw(ptr as *const TaskWaker) };
    arc.wake();
}

/// Wakes the task without consuming the waker.
fn wake_by_ref_raw(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskWaker>::from_raw(ptr as *const TaskWaker) };
    arc.wake();
    mem::forget(arc);
}

/// Drops the raw waker, decrementing the reference count.
fn drop_raw(ptr: *const ()) {
    unsafe { drop(Arc::<TaskWaker>::from_raw(ptr as *const TaskWaker)) };
}
