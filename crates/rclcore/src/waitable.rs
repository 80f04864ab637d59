// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capabilities shared by endpoints that can sit in a [`WaitSet`](crate::WaitSet).

use crate::error::Result;
use crate::primitive::{HandleId, RawHandle};

/// Explicit, idempotent release of a middleware resource.
///
/// Owners also release in `Drop`; calling `dispose` earlier only makes the
/// release point explicit.
pub trait Disposable: Send + Sync {
    fn dispose(&self) -> Result<()>;

    fn is_disposed(&self) -> bool;
}

/// An endpoint that can be polled for readiness and consume one unit of work.
pub trait Waitable: Disposable {
    /// Identifier of the underlying primitive handle; stable for the
    /// lifetime of the endpoint.
    fn handle_id(&self) -> HandleId;

    /// Primitive handle placed into the wait primitive.
    ///
    /// Fails with `Disposed` once the endpoint has been disposed.
    fn handle(&self) -> Result<RawHandle>;

    /// Try to consume one unit of available work.
    ///
    /// `Ok(false)` means nothing was available; that is not an error.
    fn try_process(&self) -> Result<bool>;
}

/// Type-erased subscription as tracked by a wait set.
pub trait SubscriptionBase: Waitable {
    fn topic(&self) -> &str;
}

/// Type-erased service server as tracked by a wait set.
pub trait ServiceBase: Waitable {
    fn topic(&self) -> &str;
}

/// Type-erased service client as tracked by a wait set.
pub trait ClientBase: Waitable {
    fn topic(&self) -> &str;

    /// Correlation ids of the calls still awaiting a response (a copy).
    fn pending_requests(&self) -> Vec<i64>;

    fn service_is_available(&self) -> Result<bool>;
}

/// Map a take outcome to `try_process` semantics: nothing available is `None`,
/// every other failure propagates.
pub(crate) fn took<T>(outcome: Result<Option<T>>) -> Result<Option<T>> {
    match outcome {
        Err(err) if err.is_take_failed() => Ok(None),
        other => other,
    }
}

/// One-way disposed flag shared by the endpoint types.
#[derive(Debug, Default)]
pub(crate) struct DisposeFlag(std::sync::atomic::AtomicBool);

impl DisposeFlag {
    /// Set the flag; `true` only for the call that actually flipped it.
    pub(crate) fn mark(&self) -> bool {
        !self.0.swap(true, std::sync::atomic::Ordering::AcqRel)
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }
}
