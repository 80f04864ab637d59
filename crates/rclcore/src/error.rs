// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every layer of the binding.

use crate::primitive::EntityKind;
use thiserror::Error;

/// Errors emitted by the binding core and the middleware primitives.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// The named resource (or the owner it depends on) has been disposed.
    #[error("{0} has been disposed")]
    Disposed(String),

    // ========================================================================
    // Wait set usage
    // ========================================================================
    #[error("wait set has no registered waitables")]
    EmptyWaitSet,
    #[error("wait result is stale: the wait set started a new wait or was disposed")]
    StaleWaitResult,
    #[error("wait timed out")]
    Timeout,
    #[error("{kind} position {index} is out of range")]
    IndexOutOfRange { kind: EntityKind, index: usize },
    #[error("{kind} capacity of {capacity} slots exceeded")]
    CapacityExceeded { kind: EntityKind, capacity: usize },

    // ========================================================================
    // Request/response
    // ========================================================================
    #[error("request was cancelled")]
    Cancelled,

    // ========================================================================
    // Transport
    // ========================================================================
    /// Nothing available to take. Endpoints map this to `try_process() == false`.
    #[error("take failed: no data available")]
    TakeFailed,
    #[error("type mismatch on '{name}': registered as '{expected}', got '{found}'")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("middleware error: {0}")]
    Middleware(String),
}

impl Error {
    pub(crate) fn disposed(what: impl Into<String>) -> Self {
        Self::Disposed(what.into())
    }

    /// True for the resource-disposed category.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed(_))
    }

    /// True when a take found nothing to consume.
    #[must_use]
    pub fn is_take_failed(&self) -> bool {
        matches!(self, Self::TakeFailed)
    }
}

/// Convenient alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;
