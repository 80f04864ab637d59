// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed subscription with a per-message callback.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::primitive::{HandleId, RawHandle, SubscriptionPrimitive};
use crate::waitable::{took, DisposeFlag, Disposable, SubscriptionBase, Waitable};

pub struct Subscription<T: Message> {
    topic: String,
    primitive: Box<dyn SubscriptionPrimitive>,
    handle_id: HandleId,
    callback: Box<dyn Fn(T) + Send + Sync>,
    disposed: DisposeFlag,
}

impl<T: Message> Subscription<T> {
    pub(crate) fn new<F>(topic: String, primitive: Box<dyn SubscriptionPrimitive>, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handle_id = primitive.handle().handle_id();
        Self {
            topic,
            primitive,
            handle_id,
            callback: Box::new(callback),
            disposed: DisposeFlag::default(),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::disposed(format!("subscription on '{}'", self.topic)));
        }
        Ok(())
    }
}

impl<T: Message> Disposable for Subscription<T> {
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

impl<T: Message> Waitable for Subscription<T> {
    fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    fn handle(&self) -> Result<RawHandle> {
        self.ensure_live()?;
        Ok(self.primitive.handle())
    }

    /// Take one message and hand it to the callback.
    fn try_process(&self) -> Result<bool> {
        self.ensure_live()?;
        let Some(payload) = took(self.primitive.take())? else {
            return Ok(false);
        };
        let message = T::decode(&payload)?;
        (self.callback)(message);
        Ok(true)
    }
}

impl<T: Message> SubscriptionBase for Subscription<T> {
    fn topic(&self) -> &str {
        &self.topic
    }
}

impl<T: Message> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("[subscription] '{}' dispose on drop failed: {}", self.topic, e);
        }
    }
}
