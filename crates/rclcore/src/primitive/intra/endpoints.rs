// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport primitives.
//!
//! Every primitive finalizes itself on drop, so an endpoint that is never
//! explicitly disposed still leaves its bus.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use super::domain::{Envelope, PublisherHistory, ServiceBus, TopicBus};
use super::handle::{next_handle_id, EntityQueue, GuardHandle};
use crate::error::{Error, Result};
use crate::primitive::{
    ClientPrimitive, EntityHandle, EntityKind, Gid, GuardPrimitive, HandleId, PublisherPrimitive,
    RawHandle, RequestId, ServicePrimitive, SubscriptionPrimitive,
};
use crate::qos::QosProfile;

/// Generate a unique client GID from timestamp, thread id hash and a counter.
pub(crate) fn generate_client_gid() -> Gid {
    use std::hash::{Hash, Hasher};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    let tid_hash = {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        hasher.finish() as u32
    };

    let mut gid = [0u8; 16];
    gid[0..8].copy_from_slice(&nanos.to_le_bytes());
    gid[8..12].copy_from_slice(&tid_hash.to_le_bytes());
    gid[12..16].copy_from_slice(&COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    gid
}

pub(crate) struct IntraGuard {
    handle: Arc<GuardHandle>,
}

impl IntraGuard {
    pub(crate) fn new() -> Self {
        Self {
            handle: Arc::new(GuardHandle::new()),
        }
    }
}

impl GuardPrimitive for IntraGuard {
    fn handle(&self) -> RawHandle {
        self.handle.clone()
    }

    fn trigger(&self) -> Result<()> {
        if self.handle.trigger() {
            Ok(())
        } else {
            Err(Error::disposed("guard condition"))
        }
    }

    fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    fn fini(&self) -> Result<()> {
        self.handle.invalidate();
        Ok(())
    }
}

impl Drop for IntraGuard {
    fn drop(&mut self) {
        self.handle.invalidate();
    }
}

pub(crate) struct IntraPublisher {
    id: HandleId,
    bus: Arc<TopicBus>,
    reliable: bool,
    history: Option<Arc<PublisherHistory>>,
    valid: AtomicBool,
}

impl IntraPublisher {
    pub(crate) fn new(bus: Arc<TopicBus>, qos: &QosProfile) -> Self {
        let id = next_handle_id();
        let history = qos
            .is_transient_local()
            .then(|| Arc::new(PublisherHistory::new(qos.queue_bound().unwrap_or(usize::MAX))));
        bus.attach_publisher(id, qos.is_reliable(), history.as_ref());
        Self {
            id,
            bus,
            reliable: qos.is_reliable(),
            history,
            valid: AtomicBool::new(true),
        }
    }
}

impl PublisherPrimitive for IntraPublisher {
    fn publish(&self, payload: &[u8]) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("publisher on '{}'", self.bus.name())));
        }
        if let Some(history) = &self.history {
            history.record(payload);
        }
        let reached = self.bus.publish(self.reliable, payload);
        log::trace!("[intra] published {} bytes to {} subscriptions", payload.len(), reached);
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn fini(&self) -> Result<()> {
        if self.valid.swap(false, Ordering::AcqRel) {
            self.bus.detach_publisher(self.id);
        }
        Ok(())
    }
}

impl Drop for IntraPublisher {
    fn drop(&mut self) {
        let _ = self.fini();
    }
}

pub(crate) struct IntraSubscription {
    bus: Arc<TopicBus>,
    queue: Arc<EntityQueue<Vec<u8>>>,
}

impl IntraSubscription {
    pub(crate) fn new(bus: Arc<TopicBus>, qos: &QosProfile) -> Self {
        let queue = Arc::new(EntityQueue::new(EntityKind::Subscription, qos.queue_bound()));
        bus.attach_subscriber(&queue, qos);
        Self { bus, queue }
    }
}

impl SubscriptionPrimitive for IntraSubscription {
    fn handle(&self) -> RawHandle {
        self.queue.clone()
    }

    fn take(&self) -> Result<Option<Vec<u8>>> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("subscription on '{}'", self.bus.name())));
        }
        Ok(self.queue.pop())
    }

    fn is_valid(&self) -> bool {
        self.queue.is_valid()
    }

    fn fini(&self) -> Result<()> {
        if self.queue.invalidate() {
            self.bus.detach_subscriber(self.queue.id());
        }
        Ok(())
    }
}

impl Drop for IntraSubscription {
    fn drop(&mut self) {
        let _ = self.fini();
    }
}

pub(crate) struct IntraClient {
    gid: Gid,
    bus: Arc<ServiceBus>,
    queue: Arc<EntityQueue<Envelope>>,
    next_sequence: AtomicI64,
}

impl IntraClient {
    pub(crate) fn new(bus: Arc<ServiceBus>, qos: &QosProfile) -> Self {
        let gid = generate_client_gid();
        let queue = Arc::new(EntityQueue::new(EntityKind::Client, qos.queue_bound()));
        bus.attach_client(gid, &queue);
        Self {
            gid,
            bus,
            queue,
            next_sequence: AtomicI64::new(1),
        }
    }
}

impl ClientPrimitive for IntraClient {
    fn handle(&self) -> RawHandle {
        self.queue.clone()
    }

    fn gid(&self) -> Gid {
        self.gid
    }

    fn send_request(&self, payload: &[u8]) -> Result<i64> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("client for service '{}'", self.bus.name())));
        }
        let sequence_number = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let request_id = RequestId {
            client_gid: self.gid,
            sequence_number,
        };
        if !self.bus.deliver_request(request_id, payload.to_vec()) {
            log::debug!(
                "[intra] no server for '{}', request {} dropped",
                self.bus.name(),
                sequence_number
            );
        }
        Ok(sequence_number)
    }

    fn take_response(&self) -> Result<Option<(RequestId, Vec<u8>)>> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("client for service '{}'", self.bus.name())));
        }
        Ok(self.queue.pop())
    }

    fn service_is_available(&self) -> Result<bool> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("client for service '{}'", self.bus.name())));
        }
        Ok(self.bus.has_server())
    }

    fn is_valid(&self) -> bool {
        self.queue.is_valid()
    }

    fn fini(&self) -> Result<()> {
        if self.queue.invalidate() {
            self.bus.detach_client(&self.gid);
        }
        Ok(())
    }
}

impl Drop for IntraClient {
    fn drop(&mut self) {
        let _ = self.fini();
    }
}

pub(crate) struct IntraService {
    bus: Arc<ServiceBus>,
    queue: Arc<EntityQueue<Envelope>>,
}

impl IntraService {
    pub(crate) fn new(bus: Arc<ServiceBus>, qos: &QosProfile) -> Result<Self> {
        let queue = Arc::new(EntityQueue::new(EntityKind::Service, qos.queue_bound()));
        bus.attach_server(&queue)?;
        Ok(Self { bus, queue })
    }
}

impl ServicePrimitive for IntraService {
    fn handle(&self) -> RawHandle {
        self.queue.clone()
    }

    fn take_request(&self) -> Result<Option<(RequestId, Vec<u8>)>> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("service '{}'", self.bus.name())));
        }
        Ok(self.queue.pop())
    }

    fn send_response(&self, request_id: &RequestId, payload: &[u8]) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::disposed(format!("service '{}'", self.bus.name())));
        }
        if !self.bus.deliver_response(request_id, payload.to_vec()) {
            log::debug!(
                "[intra] client for response {} on '{}' is gone, dropped",
                request_id.sequence_number,
                self.bus.name()
            );
        }
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.queue.is_valid()
    }

    fn fini(&self) -> Result<()> {
        if self.queue.invalidate() {
            self.bus.detach_server(self.queue.id());
        }
        Ok(())
    }
}

impl Drop for IntraService {
    fn drop(&mut self) {
        let _ = self.fini();
    }
}
