// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Guard condition - an application-controlled wake-up signal.
//!
//! `trigger` may be called from any thread, including while another thread
//! is blocked in [`WaitSet::wait`](crate::WaitSet::wait). A trigger stays
//! pending until a wait observes it.

use crate::error::{Error, Result};
use crate::primitive::{GuardPrimitive, HandleId, RawHandle};
use crate::waitable::{DisposeFlag, Disposable, Waitable};

pub struct GuardCondition {
    primitive: Box<dyn GuardPrimitive>,
    handle_id: HandleId,
    callback: Box<dyn Fn() + Send + Sync>,
    disposed: DisposeFlag,
}

impl GuardCondition {
    /// Wrap a middleware guard; `callback` runs on every `try_process`.
    pub fn new<F>(primitive: Box<dyn GuardPrimitive>, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle_id = primitive.handle().handle_id();
        Self {
            primitive,
            handle_id,
            callback: Box::new(callback),
            disposed: DisposeFlag::default(),
        }
    }

    /// Wake any wait set holding this guard condition.
    pub fn trigger(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::disposed("guard condition"));
        }
        self.primitive.trigger()
    }
}

impl Disposable for GuardCondition {
    fn dispose(&self) -> Result<()> {
        if self.disposed.mark() {
            self.primitive.fini()?;
        }
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.is_set() || !self.primitive.is_valid()
    }
}

impl Waitable for GuardCondition {
    fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    fn handle(&self) -> Result<RawHandle> {
        if self.is_disposed() {
            return Err(Error::disposed("guard condition"));
        }
        Ok(self.primitive.handle())
    }

    /// Run the callback. Always reports work done.
    fn try_process(&self) -> Result<bool> {
        if self.is_disposed() {
            return Err(Error::disposed("guard condition"));
        }
        (self.callback)();
        Ok(true)
    }
}

impl Drop for GuardCondition {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("[guard] dispose on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for GuardCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardCondition")
            .field("handle_id", &self.handle_id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
