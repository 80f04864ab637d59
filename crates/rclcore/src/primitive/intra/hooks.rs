// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Weak wait-signal registrations held by every in-process entity.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::primitive::WaitSignal;

struct SignalHook {
    id: u64,
    signal: Weak<dyn WaitSignal>,
}

/// Signals to raise when the owning entity becomes ready.
#[derive(Default)]
pub(crate) struct SignalHooks {
    hooks: Mutex<Vec<SignalHook>>,
}

impl SignalHooks {
    /// Register `signal`, replacing an earlier registration with the same id.
    pub(crate) fn add(&self, signal: Arc<dyn WaitSignal>) {
        let id = signal.id();
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| hook.id != id);
        hooks.push(SignalHook {
            id,
            signal: Arc::downgrade(&signal),
        });
    }

    pub(crate) fn remove(&self, signal_id: u64) {
        self.hooks.lock().retain(|hook| hook.id != signal_id);
    }

    /// Raise every live signal and forget the dead ones.
    pub(crate) fn notify(&self) {
        self.hooks.lock().retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.lock().len()
    }
}

impl std::fmt::Debug for SignalHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalHooks")
            .field("count", &self.len())
            .finish()
    }
}
