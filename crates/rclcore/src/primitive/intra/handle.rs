// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process entity handles: message queues and guard triggers.

use crossbeam::queue::{ArrayQueue, SegQueue};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::hooks::SignalHooks;
use crate::primitive::{EntityHandle, EntityKind, HandleId, WaitSignal};

/// Allocate a process-unique handle id.
pub(crate) fn next_handle_id() -> HandleId {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

enum Storage<T> {
    /// KEEP_LAST: pushing into a full queue evicts the oldest item.
    Bounded(ArrayQueue<T>),
    /// KEEP_ALL
    Unbounded(SegQueue<T>),
}

/// Inbound queue of a subscription, client or service.
///
/// Ready while non-empty.
pub(crate) struct EntityQueue<T> {
    id: HandleId,
    kind: EntityKind,
    storage: Storage<T>,
    valid: AtomicBool,
    hooks: SignalHooks,
}

impl<T: Send> EntityQueue<T> {
    /// `bound` of `None` keeps every item until taken.
    pub(crate) fn new(kind: EntityKind, bound: Option<usize>) -> Self {
        let storage = match bound {
            Some(depth) => Storage::Bounded(ArrayQueue::new(depth.max(1))),
            None => Storage::Unbounded(SegQueue::new()),
        };
        Self {
            id: next_handle_id(),
            kind,
            storage,
            valid: AtomicBool::new(true),
            hooks: SignalHooks::default(),
        }
    }

    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    /// Enqueue and wake attached waiters. Returns `false` once invalidated.
    pub(crate) fn push(&self, item: T) -> bool {
        if !self.valid.load(Ordering::Acquire) {
            return false;
        }
        match &self.storage {
            Storage::Bounded(queue) => {
                if queue.force_push(item).is_some() {
                    log::trace!("[intra] {} queue {} full, dropped oldest", self.kind, self.id);
                }
            }
            Storage::Unbounded(queue) => queue.push(item),
        }
        self.hooks.notify();
        true
    }

    pub(crate) fn pop(&self) -> Option<T> {
        match &self.storage {
            Storage::Bounded(queue) => queue.pop(),
            Storage::Unbounded(queue) => queue.pop(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.storage {
            Storage::Bounded(queue) => queue.len(),
            Storage::Unbounded(queue) => queue.len(),
        }
    }

    /// Stop accepting items, drop what is queued and wake attached waiters.
    /// Returns `true` on the first call.
    pub(crate) fn invalidate(&self) -> bool {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return false;
        }
        while self.pop().is_some() {}
        self.hooks.notify();
        true
    }
}

impl<T: Send> EntityHandle for EntityQueue<T> {
    fn handle_id(&self) -> HandleId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn is_ready(&self) -> bool {
        self.is_valid() && self.len() > 0
    }

    fn add_wait_signal(&self, signal: Arc<dyn WaitSignal>) {
        self.hooks.add(signal);
    }

    fn remove_wait_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }
}

/// Edge-triggered wake-up flag.
///
/// A trigger stays pending until a wait observes it.
#[derive(Debug)]
pub(crate) struct GuardHandle {
    id: HandleId,
    triggered: AtomicBool,
    valid: AtomicBool,
    hooks: SignalHooks,
}

impl GuardHandle {
    pub(crate) fn new() -> Self {
        Self {
            id: next_handle_id(),
            triggered: AtomicBool::new(false),
            valid: AtomicBool::new(true),
            hooks: SignalHooks::default(),
        }
    }

    pub(crate) fn trigger(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        self.triggered.store(true, Ordering::Release);
        self.hooks.notify();
        true
    }

    /// Returns `true` on the first call; attached waiters are woken.
    pub(crate) fn invalidate(&self) -> bool {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.hooks.notify();
        true
    }
}

impl EntityHandle for GuardHandle {
    fn handle_id(&self) -> HandleId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::GuardCondition
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn is_ready(&self) -> bool {
        self.is_valid() && self.triggered.swap(false, Ordering::AcqRel)
    }

    fn add_wait_signal(&self, signal: Arc<dyn WaitSignal>) {
        self.hooks.add(signal);
    }

    fn remove_wait_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }
}
