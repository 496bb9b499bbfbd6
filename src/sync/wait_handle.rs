//! Signal-once blocking handle.
//!
//! [`WaitHandle`] is a manual-reset event: once set it stays set, and every
//! thread blocked in [`WaitHandle::wait`] wakes up. A completion result
//! creates at most one handle and shares it with every caller of
//! `wait_handle()`.
//!
//! Closing the handle releases it for good: waiters return immediately and
//! the handle never blocks again.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct HandleState {
    signaled: bool,
    closed: bool,
}

/// A shared, signal-once blocking handle.
#[derive(Debug)]
pub struct WaitHandle {
    state: Mutex<HandleState>,
    cvar: Condvar,
}

impl WaitHandle {
    /// Creates a handle, already signaled when `signaled` is true.
    pub(crate) fn new(signaled: bool) -> Self {
        Self {
            state: Mutex::new(HandleState {
                signaled,
                closed: false,
            }),
            cvar: Condvar::new(),
        }
    }

    /// Returns true once the handle has been signaled.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.lock().signaled
    }

    /// Returns true once the handle has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Blocks the calling thread until the handle is signaled or released.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        while !state.signaled && !state.closed {
            self.cvar.wait(&mut state);
        }
    }

    /// Signals the handle, waking every blocked thread.
    pub(crate) fn set(&self) {
        let mut state = self.state.lock();
        if state.signaled {
            return;
        }
        state.signaled = true;
        drop(state);
        self.cvar.notify_all();
    }

    /// Releases the handle. Later waits return immediately.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.cvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn initially_signaled_does_not_block() {
        init_test("initially_signaled_does_not_block");
        let handle = WaitHandle::new(true);
        handle.wait();
        let set = handle.is_set();
        crate::assert_with_log!(set, "handle set", true, set);
        crate::test_complete!("initially_signaled_does_not_block");
    }

    #[test]
    fn set_wakes_all_waiters() {
        init_test("set_wakes_all_waiters");
        let handle = Arc::new(WaitHandle::new(false));
        let woken = Arc::new(AtomicUsize::new(0));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let woken = Arc::clone(&woken);
                thread::spawn(move || {
                    handle.wait();
                    woken.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        let before = woken.load(Ordering::SeqCst);
        crate::assert_with_log!(before == 0, "nobody woken yet", 0usize, before);

        handle.set();
        for waiter in waiters {
            waiter.join().expect("waiter panicked");
        }

        let after = woken.load(Ordering::SeqCst);
        crate::assert_with_log!(after == 3, "all woken", 3usize, after);
        crate::test_complete!("set_wakes_all_waiters");
    }

    #[test]
    fn close_releases_waiter() {
        init_test("close_releases_waiter");
        let handle = Arc::new(WaitHandle::new(false));
        let waiter = {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.wait())
        };

        thread::sleep(Duration::from_millis(20));
        handle.close();
        waiter.join().expect("waiter panicked");

        let closed = handle.is_closed();
        crate::assert_with_log!(closed, "handle closed", true, closed);
        let set = handle.is_set();
        crate::assert_with_log!(!set, "close does not signal", false, set);
        crate::test_complete!("close_releases_waiter");
    }

    #[test]
    fn set_is_idempotent() {
        init_test("set_is_idempotent");
        let handle = WaitHandle::new(false);
        handle.set();
        handle.set();
        handle.wait();
        crate::test_complete!("set_is_idempotent");
    }
}
