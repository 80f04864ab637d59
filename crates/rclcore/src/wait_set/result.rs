// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot of readiness produced by one wait.

use std::sync::Arc;

use super::{Shared, State};
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::primitive::{EntityKind, Slot, WaitSetPrimitive};
use crate::waitable::{ClientBase, ServiceBase, SubscriptionBase, Waitable};

/// Readiness view valid for exactly one wait.
///
/// Every accessor fails with [`Error::StaleWaitResult`] once the owning
/// wait set has started another wait or has been disposed.
pub struct WaitResult {
    shared: Arc<Shared>,
    version: u64,
}

impl WaitResult {
    pub(super) fn new(shared: Arc<Shared>, version: u64) -> Self {
        Self { shared, version }
    }

    /// The wait this result was produced by.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_stale(&self) -> bool {
        self.shared.is_disposed() || self.shared.version() != self.version
    }

    fn with_state<R>(&self, read: impl FnOnce(&State) -> Result<R>) -> Result<R> {
        if self.is_stale() {
            return Err(Error::StaleWaitResult);
        }
        let state = self.shared.lock();
        // A wait may have started between the check and the lock.
        if self.is_stale() {
            return Err(Error::StaleWaitResult);
        }
        read(&*state)
    }

    pub fn ready_subscriptions(&self) -> Result<Vec<Arc<dyn SubscriptionBase>>> {
        self.with_state(|state| {
            ready_of(
                state.primitive(),
                EntityKind::Subscription,
                &state.placed().subscriptions,
            )
        })
    }

    pub fn ready_guard_conditions(&self) -> Result<Vec<Arc<GuardCondition>>> {
        self.with_state(|state| {
            ready_of(
                state.primitive(),
                EntityKind::GuardCondition,
                &state.placed().guard_conditions,
            )
        })
    }

    pub fn ready_clients(&self) -> Result<Vec<Arc<dyn ClientBase>>> {
        self.with_state(|state| {
            ready_of(state.primitive(), EntityKind::Client, &state.placed().clients)
        })
    }

    pub fn ready_services(&self) -> Result<Vec<Arc<dyn ServiceBase>>> {
        self.with_state(|state| {
            ready_of(state.primitive(), EntityKind::Service, &state.placed().services)
        })
    }

    /// All four ready lists, read under a single lock.
    pub fn ready(&self) -> Result<ReadySet> {
        self.with_state(|state| {
            let primitive = state.primitive();
            let placed = state.placed();
            Ok(ReadySet {
                subscriptions: ready_of(primitive, EntityKind::Subscription, &placed.subscriptions)?,
                guard_conditions: ready_of(
                    primitive,
                    EntityKind::GuardCondition,
                    &placed.guard_conditions,
                )?,
                clients: ready_of(primitive, EntityKind::Client, &placed.clients)?,
                services: ready_of(primitive, EntityKind::Service, &placed.services)?,
            })
        })
    }
}

impl std::fmt::Debug for WaitResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitResult")
            .field("version", &self.version)
            .field("stale", &self.is_stale())
            .finish()
    }
}

/// Position `i` of the primitive corresponds to `placed[i]`.
fn ready_of<T: Waitable + ?Sized>(
    primitive: &dyn WaitSetPrimitive,
    kind: EntityKind,
    placed: &[Arc<T>],
) -> Result<Vec<Arc<T>>> {
    let mut ready = Vec::new();
    for (index, waitable) in placed.iter().enumerate() {
        match primitive.get(kind, index) {
            Some(Slot::Filled(handle_id)) => {
                debug_assert_eq!(handle_id, waitable.handle_id(), "{kind} position {index}");
                ready.push(Arc::clone(waitable));
            }
            Some(Slot::Empty) => {}
            None => return Err(Error::IndexOutOfRange { kind, index }),
        }
    }
    Ok(ready)
}

/// Owned copy of the ready waitables of one wait.
///
/// Unlike [`WaitResult`] this stays usable after the next wait.
#[derive(Clone, Default)]
pub struct ReadySet {
    pub subscriptions: Vec<Arc<dyn SubscriptionBase>>,
    pub guard_conditions: Vec<Arc<GuardCondition>>,
    pub clients: Vec<Arc<dyn ClientBase>>,
    pub services: Vec<Arc<dyn ServiceBase>>,
}

impl ReadySet {
    pub fn len(&self) -> usize {
        self.subscriptions.len() + self.guard_conditions.len() + self.clients.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `try_process` once on every ready waitable and count the ones
    /// that did work. Stops at the first error.
    pub fn process_all(&self) -> Result<usize> {
        let mut processed = 0;
        for subscription in &self.subscriptions {
            processed += usize::from(subscription.try_process()?);
        }
        for guard in &self.guard_conditions {
            processed += usize::from(guard.try_process()?);
        }
        for client in &self.clients {
            processed += usize::from(client.try_process()?);
        }
        for service in &self.services {
            processed += usize::from(service.try_process()?);
        }
        Ok(processed)
    }
}

impl std::fmt::Debug for ReadySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadySet")
            .field("subscriptions", &self.subscriptions.len())
            .field("guard_conditions", &self.guard_conditions.len())
            .field("clients", &self.clients.len())
            .field("services", &self.services.len())
            .finish()
    }
}
