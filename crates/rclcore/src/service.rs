// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service server: answers each request through a callback.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::primitive::{HandleId, RawHandle, ServicePrimitive};
use crate::waitable::{took, DisposeFlag, Disposable, ServiceBase, Waitable};

pub struct Service<Req: Message, Resp: Message> {
    name: String,
    primitive: Box<dyn ServicePrimitive>,
    handle_id: HandleId,
    callback: Box<dyn Fn(Req) -> Resp + Send + Sync>,
    disposed: DisposeFlag,
    _response: PhantomData<fn() -> Resp>,
}

impl<Req: Message, Resp: Message> Service<Req, Resp> {
    pub(crate) fn new<F>(name: String, primitive: Box<dyn ServicePrimitive>, callback: F) -> Self
    where
        F: Fn(Req) -> Resp + Send + Sync + 'static,
    {
        let handle_id = primitive.handle().handle_id();
        Self {
            name,
            primitive,
            handle_id,
            callback: Box::new(callback),
            disposed: DisposeFlag::default(),
            _response: PhantomData,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::disposed(format!("service '{}'", self.name)));
        }
        Ok(())
    }
}

impl<Req: Message, Resp: Message> Disposable for Service<Req, Resp> {
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

impl<Req: Message, Resp: Message> Waitable for Service<Req, Resp> {
    fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    fn handle(&self) -> Result<RawHandle> {
        self.ensure_live()?;
        Ok(self.primitive.handle())
    }

    /// Take one request, run the callback, send the response under the same id.
    fn try_process(&self) -> Result<bool> {
        self.ensure_live()?;
        let Some((request_id, payload)) = took(self.primitive.take_request())? else {
            return Ok(false);
        };
        let request = Req::decode(&payload)?;
        let response = (self.callback)(request).encode()?;
        self.primitive.send_response(&request_id, &response)?;
        Ok(true)
    }
}

impl<Req: Message, Resp: Message> ServiceBase for Service<Req, Resp> {
    fn topic(&self) -> &str {
        &self.name
    }
}

impl<Req: Message, Resp: Message> Drop for Service<Req, Resp> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("[service] '{}' dispose on drop failed: {}", self.name, e);
        }
    }
}
