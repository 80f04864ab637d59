// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed publisher.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::primitive::PublisherPrimitive;
use crate::waitable::{DisposeFlag, Disposable};

pub struct Publisher<T: Message> {
    topic: String,
    primitive: Box<dyn PublisherPrimitive>,
    disposed: DisposeFlag,
    _message: PhantomData<fn(T)>,
}

impl<T: Message> Publisher<T> {
    pub(crate) fn new(topic: String, primitive: Box<dyn PublisherPrimitive>) -> Self {
        Self {
            topic,
            primitive,
            disposed: DisposeFlag::default(),
            _message: PhantomData,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish(&self, message: &T) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::disposed(format!("publisher on '{}'", self.topic)));
        }
        let payload = message.encode()?;
        self.primitive.publish(&payload)
    }
}

impl<T: Message> Disposable for Publisher<T> {
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

impl<T: Message> Drop for Publisher<T> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("[publisher] '{}' dispose on drop failed: {}", self.topic, e);
        }
    }
}
