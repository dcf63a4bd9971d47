use super::LoopHandle;

use std::cell::RefCell;

thread_local! {
    /// Thread-local handle to the event loop currently being driven.
    ///
    /// This is set when entering the loop context and allows the start
    /// operation, timers and local tasks to reach the run queue without
    /// explicit parameter passing.
    static CURRENT_LOOP: RefCell<Option<LoopHandle>> = const { RefCell::new(None) };
}

/// Enters the event loop context for the current thread.
///
/// The handle is installed for the duration of the closure `f`; the previous
/// context is restored afterwards, so loops can be nested (a test helper may
/// spin a fresh loop from inside another one).
pub(crate) fn enter_context<R>(handle: LoopHandle, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_LOOP.with(|cell| cell.replace(Some(handle)));

    let out = f();

    CURRENT_LOOP.with(|cell| cell.replace(prev));

    out
}

/// Returns the loop installed by [`enter_context`], if any.
pub(crate) fn current() -> Option<LoopHandle> {
    CURRENT_LOOP.with(|cell| cell.borrow().clone())
}
