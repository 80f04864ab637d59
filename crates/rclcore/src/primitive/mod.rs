// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Narrow interface between the binding core and a middleware.
//!
//! Everything the wait set and the endpoints need from a transport is
//! expressed here as traits over opaque handles. The core never sees
//! storage layout; it only places handles into positions, waits, and
//! reads positions back.
//!
//! [`intra`] provides an in-process implementation of every trait.

pub mod intra;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::qos::QosProfile;

/// Stable identifier of a primitive handle.
pub type HandleId = u64;

/// Globally unique identifier of a client endpoint.
pub type Gid = [u8; 16];

/// The four waitable variants a wait primitive tracks positionally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Subscription,
    GuardCondition,
    Client,
    Service,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Subscription,
        EntityKind::GuardCondition,
        EntityKind::Client,
        EntityKind::Service,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Subscription => "subscription",
            EntityKind::GuardCondition => "guard condition",
            EntityKind::Client => "client",
            EntityKind::Service => "service",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal handed to entity handles so they can wake a blocked waiter.
///
/// Handles retain a weak reference and call `signal()` when they become
/// ready. The identifier lets a wait primitive detach cleanly.
pub trait WaitSignal: Send + Sync {
    /// Notify the waiter that an attached entity became ready.
    fn signal(&self);

    /// Stable identifier for this signal (per wait primitive).
    fn id(&self) -> u64;
}

/// Cancels a wait primitive's blocking wait from another thread.
///
/// After `interrupt()` the current wait, and every later one, returns a
/// disposed error. Obtained once from [`WaitSetPrimitive::interrupter`] so it
/// can be raised without the lock that guards the primitive.
pub trait WaitInterrupt: Send + Sync {
    fn interrupt(&self);
}

/// Opaque middleware handle of a waitable entity.
pub trait EntityHandle: Send + Sync {
    fn handle_id(&self) -> HandleId;

    fn kind(&self) -> EntityKind;

    /// False once the owning endpoint has been finalized.
    fn is_valid(&self) -> bool;

    /// Current readiness. Edge-triggered entities (guard conditions)
    /// consume their pending trigger when this returns `true`.
    fn is_ready(&self) -> bool;

    /// Register a signal to be raised on every readiness edge.
    fn add_wait_signal(&self, signal: Arc<dyn WaitSignal>);

    /// Remove a previously registered signal.
    fn remove_wait_signal(&self, signal_id: u64);
}

/// Shared handle as placed into a wait primitive.
pub type RawHandle = Arc<dyn EntityHandle>;

/// Number of positions per entity kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaitSetSizes {
    pub subscriptions: usize,
    pub guard_conditions: usize,
    pub clients: usize,
    pub services: usize,
}

impl WaitSetSizes {
    #[must_use]
    pub fn of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Subscription => self.subscriptions,
            EntityKind::GuardCondition => self.guard_conditions,
            EntityKind::Client => self.clients,
            EntityKind::Service => self.services,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.subscriptions + self.guard_conditions + self.clients + self.services
    }
}

/// Content of one position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Filled(HandleId),
}

impl Slot {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }
}

/// Outcome of a blocking wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    Ready,
    TimedOut,
}

/// Positional poll structure.
///
/// After [`WaitSetPrimitive::wait`] returns `Ready`, a filled position means the
/// entity placed there is ready; positions of entities that are not ready
/// have been cleared.
pub trait WaitSetPrimitive: Send {
    fn is_valid(&self) -> bool;

    /// Current number of positions per kind.
    fn sizes(&self) -> WaitSetSizes;

    /// Reallocate to exactly `sizes` positions, all empty.
    fn resize(&mut self, sizes: WaitSetSizes) -> Result<()>;

    /// Empty every position without reallocating.
    fn clear(&mut self) -> Result<()>;

    /// Place a handle. The primitive chooses the position and returns it.
    fn add(&mut self, kind: EntityKind, handle: &RawHandle) -> Result<usize>;

    /// Read a position; `None` past the end.
    fn get(&self, kind: EntityKind, index: usize) -> Option<Slot>;

    /// Block until at least one placed entity is ready. `None` blocks
    /// indefinitely, `Some(Duration::ZERO)` polls once.
    ///
    /// Fails with `Disposed` if a placed entity is invalidated or the wait
    /// is interrupted.
    fn wait(&mut self, timeout: Option<Duration>) -> Result<WaitStatus>;

    /// Release the structure. Idempotent.
    fn fini(&mut self) -> Result<()>;

    /// Handle that cancels a blocked [`wait`](Self::wait).
    fn interrupter(&self) -> Arc<dyn WaitInterrupt>;
}

/// Correlation header carried by every request and response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId {
    /// Identifies the issuing client so the response can be routed back.
    pub client_gid: Gid,
    /// Correlation id assigned by the client's send primitive.
    pub sequence_number: i64,
}

/// Endpoint creation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointInfo {
    pub node_name: String,
    pub namespace: String,
    /// Topic or service name.
    pub name: String,
    pub type_name: String,
    pub qos: QosProfile,
}

pub trait GuardPrimitive: Send + Sync {
    fn handle(&self) -> RawHandle;

    /// Set the trigger; safe to call from any thread.
    fn trigger(&self) -> Result<()>;

    fn is_valid(&self) -> bool;

    fn fini(&self) -> Result<()>;
}

pub trait PublisherPrimitive: Send + Sync {
    fn publish(&self, payload: &[u8]) -> Result<()>;

    fn is_valid(&self) -> bool;

    fn fini(&self) -> Result<()>;
}

pub trait SubscriptionPrimitive: Send + Sync {
    fn handle(&self) -> RawHandle;

    /// Take one message. `Ok(None)` (or `Err(TakeFailed)`) means nothing available.
    fn take(&self) -> Result<Option<Vec<u8>>>;

    fn is_valid(&self) -> bool;

    fn fini(&self) -> Result<()>;
}

pub trait ClientPrimitive: Send + Sync {
    fn handle(&self) -> RawHandle;

    fn gid(&self) -> Gid;

    /// Send a request, returning its correlation id.
    fn send_request(&self, payload: &[u8]) -> Result<i64>;

    /// Take one response. `Ok(None)` (or `Err(TakeFailed)`) means nothing available.
    fn take_response(&self) -> Result<Option<(RequestId, Vec<u8>)>>;

    fn service_is_available(&self) -> Result<bool>;

    fn is_valid(&self) -> bool;

    fn fini(&self) -> Result<()>;
}

pub trait ServicePrimitive: Send + Sync {
    fn handle(&self) -> RawHandle;

    /// Take one request. `Ok(None)` (or `Err(TakeFailed)`) means nothing available.
    fn take_request(&self) -> Result<Option<(RequestId, Vec<u8>)>>;

    fn send_response(&self, request_id: &RequestId, payload: &[u8]) -> Result<()>;

    fn is_valid(&self) -> bool;

    fn fini(&self) -> Result<()>;
}

/// Factory for every primitive of one middleware instance.
pub trait Middleware: Send + Sync {
    fn identifier(&self) -> &str;

    fn is_valid(&self) -> bool;

    fn create_wait_set(&self) -> Result<Box<dyn WaitSetPrimitive>>;

    fn create_guard_condition(&self) -> Result<Box<dyn GuardPrimitive>>;

    fn create_publisher(&self, info: &EndpointInfo) -> Result<Box<dyn PublisherPrimitive>>;

    fn create_subscription(&self, info: &EndpointInfo) -> Result<Box<dyn SubscriptionPrimitive>>;

    fn create_client(&self, info: &EndpointInfo) -> Result<Box<dyn ClientPrimitive>>;

    fn create_service(&self, info: &EndpointInfo) -> Result<Box<dyn ServicePrimitive>>;

    /// Invalidate the middleware; later creations fail with `Disposed`. Idempotent.
    fn shutdown(&self) -> Result<()>;
}
