// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait set - blocks until registered waitables have work.
//!
//! # Architecture
//!
//! ```text
//! WaitSet (owned by the driving thread)
//! +-- shared: Arc<Shared>
//!     +-- version: AtomicU64     bumped before every wait and on dispose
//!     +-- disposed: AtomicBool
//!     +-- interrupter            cancels a blocked wait on dispose
//!     +-- state: Mutex<State>
//!         +-- collections        registration sets, one dense Vec per kind
//!         +-- placed             collections as mirrored by the last refill
//!         +-- primitive          positional poll structure
//! ```
//!
//! Before each wait the primitive is refilled from the collections. The
//! primitive may place a handle at any free position; the collection is
//! permuted to follow, so collection index and position always agree.
//! Iteration order is therefore not stable across waits.
//!
//! A [`WaitResult`] only stays readable until the next wait starts or the
//! wait set is disposed. Disposing the wait set, or a waitable placed in it,
//! while a wait is blocked makes that wait fail with `Disposed`.

mod result;


pub use result::{ReadySet, WaitResult};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::primitive::{
    EntityKind, HandleId, Slot, WaitInterrupt, WaitSetPrimitive, WaitSetSizes, WaitStatus,
};
use crate::waitable::{ClientBase, Disposable, ServiceBase, SubscriptionBase, Waitable};

/// Waitables of every kind, one dense array each.
#[derive(Clone, Default)]
pub(crate) struct Collections {
    pub(crate) subscriptions: Vec<Arc<dyn SubscriptionBase>>,
    pub(crate) guard_conditions: Vec<Arc<GuardCondition>>,
    pub(crate) clients: Vec<Arc<dyn ClientBase>>,
    pub(crate) services: Vec<Arc<dyn ServiceBase>>,
}

impl Collections {
    fn sizes(&self) -> WaitSetSizes {
        WaitSetSizes {
            subscriptions: self.subscriptions.len(),
            guard_conditions: self.guard_conditions.len(),
            clients: self.clients.len(),
            services: self.services.len(),
        }
    }

    fn len(&self) -> usize {
        self.sizes().total()
    }

    fn contains(&self, handle_id: HandleId) -> bool {
        self.subscriptions.iter().any(|w| w.handle_id() == handle_id)
            || self.guard_conditions.iter().any(|w| w.handle_id() == handle_id)
            || self.clients.iter().any(|w| w.handle_id() == handle_id)
            || self.services.iter().any(|w| w.handle_id() == handle_id)
    }

    fn clear(&mut self) {
        self.subscriptions.clear();
        self.guard_conditions.clear();
        self.clients.clear();
        self.services.clear();
    }
}

pub(crate) struct State {
    collections: Collections,
    placed: Collections,
    primitive: Box<dyn WaitSetPrimitive>,
}

impl State {
    /// Mirror the collections into the primitive.
    fn refill(&mut self) -> Result<()> {
        let sizes = self.collections.sizes();
        if self.primitive.sizes() == sizes {
            self.primitive.clear()?;
        } else {
            self.primitive.resize(sizes)?;
        }

        let primitive = self.primitive.as_mut();
        fill(primitive, EntityKind::Subscription, &mut self.collections.subscriptions)?;
        fill(primitive, EntityKind::GuardCondition, &mut self.collections.guard_conditions)?;
        fill(primitive, EntityKind::Client, &mut self.collections.clients)?;
        fill(primitive, EntityKind::Service, &mut self.collections.services)?;

        self.placed = self.collections.clone();
        Ok(())
    }

    pub(crate) fn placed(&self) -> &Collections {
        &self.placed
    }

    pub(crate) fn primitive(&self) -> &dyn WaitSetPrimitive {
        self.primitive.as_ref()
    }
}

/// Place every waitable of one kind, permuting `waitables` so that index
/// `i` holds the waitable the primitive put at position `i`.
fn fill<T: Waitable + ?Sized>(
    primitive: &mut dyn WaitSetPrimitive,
    kind: EntityKind,
    waitables: &mut [Arc<T>],
) -> Result<()> {
    let count = waitables.len();
    if count == 0 {
        return Ok(());
    }

    let mut index = 0;
    let mut placed = 0;
    loop {
        let handle = waitables[index].handle()?;
        let position = primitive.add(kind, &handle)?;
        placed += 1;
        if placed > count {
            return Err(Error::Middleware(format!(
                "{kind} placement did not converge after {count} entries"
            )));
        }

        if position != index {
            if position >= count {
                return Err(Error::IndexOutOfRange {
                    kind,
                    index: position,
                });
            }
            // The waitable expected at `position` has not been placed yet;
            // it moves to `index` and is placed next.
            waitables.swap(index, position);
            continue;
        }

        if placed == count {
            return Ok(());
        }
        index = next_free(primitive, kind, index)?;
    }
}

fn next_free(primitive: &dyn WaitSetPrimitive, kind: EntityKind, mut index: usize) -> Result<usize> {
    loop {
        index += 1;
        match primitive.get(kind, index) {
            Some(Slot::Empty) => return Ok(index),
            Some(Slot::Filled(_)) => {}
            None => return Err(Error::IndexOutOfRange { kind, index }),
        }
    }
}

pub(crate) struct Shared {
    version: AtomicU64,
    disposed: AtomicBool,
    /// Raised without `state`, which a blocked wait holds.
    interrupter: Arc<dyn WaitInterrupt>,
    state: Mutex<State>,
}

impl Shared {
    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, State> {
        self.state.lock()
    }

    /// Release the primitive and drop every registration. Idempotent.
    ///
    /// A wait in progress on another thread is interrupted and fails with
    /// `Disposed`; disposal completes once it has returned.
    pub(crate) fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.version.fetch_add(1, Ordering::AcqRel);
        self.interrupter.interrupt();

        let mut state = self.state.lock();
        state.collections.clear();
        state.placed.clear();
        log::debug!("[waitset] disposed");
        state.primitive.fini()
    }
}

/// Readiness multiplexer over subscriptions, guard conditions, clients and services.
///
/// Registration and waiting take `&mut self`: one thread drives a wait set.
/// Guard conditions may be triggered from anywhere.
pub struct WaitSet {
    shared: Arc<Shared>,
}

macro_rules! registration {
    ($field:ident, $ty:ty, $add:ident, $remove:ident) => {
        /// Register a waitable. `Ok(false)` if it is already registered.
        pub fn $add(&mut self, waitable: Arc<$ty>) -> Result<bool> {
            self.ensure_live()?;
            if waitable.is_disposed() {
                return Err(Error::disposed(format!(
                    "waitable {} added to wait set",
                    waitable.handle_id()
                )));
            }
            let id = waitable.handle_id();
            let mut state = self.shared.lock();
            if state.collections.$field.iter().any(|w| w.handle_id() == id) {
                return Ok(false);
            }
            state.collections.$field.push(waitable);
            Ok(true)
        }

        /// Unregister a waitable. `false` if it was not registered.
        pub fn $remove(&mut self, waitable: &$ty) -> bool {
            let id = waitable.handle_id();
            let mut state = self.shared.lock();
            let before = state.collections.$field.len();
            state.collections.$field.retain(|w| w.handle_id() != id);
            state.collections.$field.len() != before
        }
    };
}

impl WaitSet {
    /// Wrap a primitive obtained from a middleware.
    pub fn new(primitive: Box<dyn WaitSetPrimitive>) -> Self {
        Self {
            shared: Arc::new(Shared {
                version: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                interrupter: primitive.interrupter(),
                state: Mutex::new(State {
                    collections: Collections::default(),
                    placed: Collections::default(),
                    primitive,
                }),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    fn ensure_live(&self) -> Result<()> {
        if self.shared.is_disposed() {
            return Err(Error::disposed("wait set"));
        }
        Ok(())
    }

    registration!(subscriptions, dyn SubscriptionBase, add_subscription, remove_subscription);
    registration!(guard_conditions, GuardCondition, add_guard_condition, remove_guard_condition);
    registration!(clients, dyn ClientBase, add_client, remove_client);
    registration!(services, dyn ServiceBase, add_service, remove_service);

    pub fn subscriptions(&self) -> Vec<Arc<dyn SubscriptionBase>> {
        self.shared.lock().collections.subscriptions.clone()
    }

    pub fn guard_conditions(&self) -> Vec<Arc<GuardCondition>> {
        self.shared.lock().collections.guard_conditions.clone()
    }

    pub fn clients(&self) -> Vec<Arc<dyn ClientBase>> {
        self.shared.lock().collections.clients.clone()
    }

    pub fn services(&self) -> Vec<Arc<dyn ServiceBase>> {
        self.shared.lock().collections.services.clone()
    }

    /// True if a waitable with this handle id is registered under any kind.
    pub fn contains(&self, handle_id: HandleId) -> bool {
        self.shared.lock().collections.contains(handle_id)
    }

    /// Number of registered waitables across all kinds.
    pub fn len(&self) -> usize {
        self.shared.lock().collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister everything.
    pub fn clear(&mut self) {
        self.shared.lock().collections.clear();
    }

    /// Unregister waitables that were disposed while registered.
    pub fn prune_disposed(&mut self) -> usize {
        let mut state = self.shared.lock();
        let before = state.collections.len();
        let collections = &mut state.collections;
        collections.subscriptions.retain(|w| !w.is_disposed());
        collections.guard_conditions.retain(|w| !w.is_disposed());
        collections.clients.retain(|w| !w.is_disposed());
        collections.services.retain(|w| !w.is_disposed());
        let pruned = before - collections.len();
        if pruned > 0 {
            log::debug!("[waitset] pruned {} disposed waitables", pruned);
        }
        pruned
    }

    /// Number of waits started so far.
    pub fn version(&self) -> u64 {
        self.shared.version()
    }

    /// Block until at least one registered waitable is ready.
    ///
    /// `None` blocks indefinitely; `Some(Duration::ZERO)` polls once.
    /// Returns `None` on timeout. Starting the wait invalidates every
    /// earlier [`WaitResult`].
    pub fn try_wait(&mut self, timeout: Option<Duration>) -> Result<Option<WaitResult>> {
        self.ensure_live()?;
        let version = self.shared.version.fetch_add(1, Ordering::AcqRel) + 1;

        let mut state = self.shared.lock();
        if state.collections.len() == 0 {
            return Err(Error::EmptyWaitSet);
        }
        state.refill()?;

        log::trace!(
            "[waitset] wait #{} on {:?}, timeout={:?}",
            version,
            state.collections.sizes(),
            timeout
        );
        let status = state.primitive.wait(timeout)?;
        drop(state);

        match status {
            WaitStatus::Ready => Ok(Some(WaitResult::new(Arc::clone(&self.shared), version))),
            WaitStatus::TimedOut => Ok(None),
        }
    }

    /// Like [`try_wait`](Self::try_wait), but a timeout is `Err(Error::Timeout)`.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<WaitResult> {
        self.try_wait(timeout)?.ok_or(Error::Timeout)
    }
}

impl Disposable for WaitSet {
    fn dispose(&self) -> Result<()> {
        self.shared.dispose()
    }

    fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        if let Err(e) = self.shared.dispose() {
            log::warn!("[waitset] dispose on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for WaitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSet")
            .field("version", &self.version())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
