// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wake notification with an atomic fast-path.
//!
//! - Atomic flag checked before any lock is taken
//! - Condvar fallback while the waiter sleeps

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Two-tier notifier used by the in-process wait primitive.
#[derive(Debug, Default)]
pub(crate) struct WakeNotifier {
    /// Set by `notify`, consumed by the waiter
    data_ready: AtomicBool,
    /// True while a waiter is parked on the condvar
    sleeping: Mutex<bool>,
    condvar: Condvar,
}

impl WakeNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a wake-up; the condvar is only signalled if someone sleeps.
    #[inline]
    pub(crate) fn notify(&self) {
        self.data_ready.store(true, Ordering::Release);

        if *self.sleeping.lock() {
            self.condvar.notify_one();
        }
    }

    /// Consume a pending wake-up without blocking.
    #[inline]
    pub(crate) fn check_and_clear(&self) -> bool {
        self.data_ready.swap(false, Ordering::Acquire)
    }

    /// Block up to `timeout`. Returns `true` if a wake-up was consumed.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.check_and_clear() {
            return true;
        }

        let mut sleeping = self.sleeping.lock();

        // Double-check after acquiring lock
        if self.check_and_clear() {
            return true;
        }

        *sleeping = true;
        let _ = self.condvar.wait_for(&mut sleeping, timeout);
        *sleeping = false;

        self.check_and_clear()
    }

    /// Block until a wake-up arrives.
    pub(crate) fn wait(&self) {
        if self.check_and_clear() {
            return;
        }

        let mut sleeping = self.sleeping.lock();
        *sleeping = true;
        while !self.check_and_clear() {
            self.condvar.wait(&mut sleeping);
        }
        *sleeping = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_notify_before_wait_is_not_lost() {
        let notifier = WakeNotifier::new();
        notifier.notify();
        assert!(notifier.wait_timeout(Duration::from_millis(1)));
        assert!(!notifier.check_and_clear());
    }

    #[test]
    fn test_wait_timeout_elapses() {
        let notifier = WakeNotifier::new();
        let start = Instant::now();
        assert!(!notifier.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_cross_thread_wake() {
        let notifier = Arc::new(WakeNotifier::new());
        let remote = Arc::clone(&notifier);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.notify();
        });

        notifier.wait();
        handle.join().expect("notifier thread panicked");
    }
}
