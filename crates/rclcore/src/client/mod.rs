// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service client.
//!
//! `call_async` may run on any thread; `try_process` is driven by whoever
//! owns the wait set. Responses are matched to calls through a
//! [`PendingRequestTable`].

pub mod pending;

pub use pending::{Delivery, PendingRequestTable, Resolver, ResponseFuture};

use std::marker::PhantomData;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::primitive::{ClientPrimitive, HandleId, RawHandle};
use crate::waitable::{took, ClientBase, DisposeFlag, Disposable, Waitable};

/// Typed client for one service.
pub struct Client<Req: Message, Resp: Message> {
    service: String,
    primitive: Box<dyn ClientPrimitive>,
    handle_id: HandleId,
    pending: PendingRequestTable<Resp>,
    disposed: DisposeFlag,
    _request: PhantomData<fn(Req)>,
}

impl<Req: Message, Resp: Message> Client<Req, Resp> {
    pub(crate) fn new(service: String, primitive: Box<dyn ClientPrimitive>) -> Self {
        let handle_id = primitive.handle().handle_id();
        let pending = PendingRequestTable::new(format!("client for service '{}'", service));
        Self {
            service,
            primitive,
            handle_id,
            pending,
            disposed: DisposeFlag::default(),
            _request: PhantomData,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::disposed(format!(
                "client for service '{}'",
                self.service
            )));
        }
        Ok(())
    }

    /// Send a request; the returned future resolves once `try_process`
    /// consumes the matching response.
    pub fn call_async(&self, request: &Req) -> Result<ResponseFuture<Resp>> {
        self.ensure_live()?;
        let payload = request.encode()?;
        let future = self
            .pending
            .register(|| self.primitive.send_request(&payload))?;
        log::debug!(
            "[client] '{}' sent request {}",
            self.service,
            future.sequence_number()
        );
        Ok(future)
    }

    /// Send a request and block until its response arrives.
    ///
    /// Some other thread must be driving `try_process` for this client.
    /// Fails with `InvalidArgument`, before sending, inside an async runtime.
    pub fn call(&self, request: &Req) -> Result<Resp> {
        pending::ensure_blocking_allowed()?;
        self.call_async(request)?.wait()
    }

    /// Await a response for at most `timeout`, cancelling the call on expiry.
    ///
    /// Cancellation safe: dropping the returned future also cancels the call.
    pub async fn call_with_timeout(&self, request: &Req, timeout: Duration) -> Result<Resp> {
        let mut call = CancelOnDrop {
            client: self,
            future: self.call_async(request)?,
        };
        tokio::time::timeout(timeout, &mut call.future)
            .await
            .unwrap_or(Err(Error::Timeout))
    }

    /// Cancel a pending call. `false` if it already completed or is unknown.
    pub fn cancel(&self, future: &ResponseFuture<Resp>) -> bool {
        let cancelled = self.pending.cancel(future);
        if cancelled {
            log::debug!(
                "[client] '{}' cancelled request {}",
                self.service,
                future.sequence_number()
            );
        }
        cancelled
    }

    /// Copy of the correlation ids still pending.
    pub fn pending_requests(&self) -> Vec<i64> {
        self.pending.pending_ids()
    }

    pub fn service_is_available(&self) -> Result<bool> {
        self.ensure_live()?;
        self.primitive.service_is_available()
    }
}

/// Cancels its call unless the response was already taken.
struct CancelOnDrop<'a, Req: Message, Resp: Message> {
    client: &'a Client<Req, Resp>,
    future: ResponseFuture<Resp>,
}

impl<Req: Message, Resp: Message> Drop for CancelOnDrop<'_, Req, Resp> {
    fn drop(&mut self) {
        self.client.cancel(&self.future);
    }
}

impl<Req: Message, Resp: Message> Disposable for Client<Req, Resp> {
    /// Fail every pending call with a disposed error, then release the primitive.
    fn dispose(&self) -> Result<()> {
        if self.disposed.mark() {
            let drained = self.pending.dispose_all();
            if drained > 0 {
                log::debug!(
                    "[client] '{}' disposed with {} pending requests",
                    self.service,
                    drained
                );
            }
            self.primitive.fini()?;
        }
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.is_set() || !self.primitive.is_valid()
    }
}

impl<Req: Message, Resp: Message> Waitable for Client<Req, Resp> {
    fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    fn handle(&self) -> Result<RawHandle> {
        self.ensure_live()?;
        Ok(self.primitive.handle())
    }

    /// Take one response and resolve the call it belongs to.
    ///
    /// A response for an id that is not pending is dropped; the take still
    /// counts as work done.
    fn try_process(&self) -> Result<bool> {
        self.ensure_live()?;
        let delivery = self.pending.receive(|| {
            Ok(took(self.primitive.take_response())?
                .map(|(request_id, payload)| (request_id.sequence_number, payload)))
        })?;
        let Some(delivery) = delivery else {
            return Ok(false);
        };

        match delivery.resolver {
            Some(resolver) => {
                let outcome = Resp::decode(&delivery.payload);
                if !resolver.resolve(outcome) {
                    log::debug!(
                        "[client] '{}' response {} arrived after its future was dropped",
                        self.service,
                        delivery.sequence_number
                    );
                }
            }
            None => log::debug!(
                "[client] '{}' received response {} which was not pending, maybe cancelled",
                self.service,
                delivery.sequence_number
            ),
        }
        Ok(true)
    }
}

impl<Req: Message, Resp: Message> ClientBase for Client<Req, Resp> {
    fn topic(&self) -> &str {
        &self.service
    }

    fn pending_requests(&self) -> Vec<i64> {
        self.pending.pending_ids()
    }

    fn service_is_available(&self) -> Result<bool> {
        Client::service_is_available(self)
    }
}

impl<Req: Message, Resp: Message> Drop for Client<Req, Resp> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("[client] '{}' dispose on drop failed: {}", self.service, e);
        }
    }
}
