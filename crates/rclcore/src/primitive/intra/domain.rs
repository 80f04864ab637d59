// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain registry for in-process topic and service matching.
//!
//! ```text
//! DomainRegistry (static global)
//! +-- domains: Mutex<HashMap<DomainId, Weak<DomainState>>>
//!
//! DomainState (one per domain, kept alive by middleware instances)
//! +-- topics:   DashMap<name, Arc<TopicBus>>
//! +-- services: DashMap<name, Arc<ServiceBus>>
//! ```
//!
//! The first endpoint on a name fixes its type; a bus with no live
//! endpoints left may be re-typed.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock, Weak};

use super::handle::EntityQueue;
use crate::error::{Error, Result};
use crate::primitive::{Gid, HandleId, RequestId};
use crate::qos::QosProfile;

/// Domain ID type
pub type DomainId = u32;

/// A request or response in flight.
pub(crate) type Envelope = (RequestId, Vec<u8>);

trait Bus {
    fn new(name: &str, type_name: &str) -> Self;
    fn type_name(&self) -> &str;
    fn is_idle(&self) -> bool;
}

fn bus_for<B: Bus>(map: &DashMap<String, Arc<B>>, name: &str, type_name: &str) -> Result<Arc<B>> {
    match map.entry(name.to_string()) {
        Entry::Occupied(mut entry) => {
            if entry.get().type_name() != type_name {
                if !entry.get().is_idle() {
                    return Err(Error::TypeMismatch {
                        name: name.to_string(),
                        expected: entry.get().type_name().to_string(),
                        found: type_name.to_string(),
                    });
                }
                log::debug!("[intra] re-typing idle '{}' as '{}'", name, type_name);
                entry.insert(Arc::new(B::new(name, type_name)));
            }
            Ok(Arc::clone(entry.get()))
        }
        Entry::Vacant(entry) => Ok(Arc::clone(entry.insert(Arc::new(B::new(name, type_name))).value())),
    }
}

/// Check delivery compatibility between publisher and subscription
///
/// - Reliable publisher -> any subscription: compatible
/// - BestEffort publisher + BestEffort subscription: compatible
/// - BestEffort publisher + Reliable subscription: INCOMPATIBLE
fn qos_compatible(publisher_reliable: bool, subscription_reliable: bool) -> bool {
    publisher_reliable || !subscription_reliable
}

/// Samples a TRANSIENT_LOCAL publisher keeps for late-joining subscriptions.
#[derive(Debug)]
pub(crate) struct PublisherHistory {
    depth: usize,
    samples: Mutex<VecDeque<Vec<u8>>>,
}

impl PublisherHistory {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn record(&self, payload: &[u8]) {
        let mut samples = self.samples.lock();
        if samples.len() == self.depth {
            samples.pop_front();
        }
        samples.push_back(payload.to_vec());
    }

    fn snapshot(&self) -> Vec<Vec<u8>> {
        self.samples.lock().iter().cloned().collect()
    }
}

struct SubscriberEntry {
    id: HandleId,
    reliable: bool,
    queue: Weak<EntityQueue<Vec<u8>>>,
}

struct PublisherEntry {
    id: HandleId,
    reliable: bool,
    history: Option<Weak<PublisherHistory>>,
}

/// Fan-out point for one topic.
pub(crate) struct TopicBus {
    name: String,
    type_name: String,
    subscribers: Mutex<Vec<SubscriberEntry>>,
    publishers: Mutex<Vec<PublisherEntry>>,
}

impl Bus for TopicBus {
    fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            subscribers: Mutex::new(Vec::new()),
            publishers: Mutex::new(Vec::new()),
        }
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn is_idle(&self) -> bool {
        self.subscriber_count() == 0 && self.publisher_count() == 0
    }
}

impl TopicBus {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Register a subscription queue; TRANSIENT_LOCAL subscriptions receive
    /// the retained samples of compatible publishers first.
    pub(crate) fn attach_subscriber(&self, queue: &Arc<EntityQueue<Vec<u8>>>, qos: &QosProfile) {
        let reliable = qos.is_reliable();
        if qos.is_transient_local() {
            let histories: Vec<Arc<PublisherHistory>> = self
                .publishers
                .lock()
                .iter()
                .filter(|entry| qos_compatible(entry.reliable, reliable))
                .filter_map(|entry| entry.history.as_ref().and_then(Weak::upgrade))
                .collect();
            for history in histories {
                for sample in history.snapshot() {
                    queue.push(sample);
                }
            }
        }

        self.subscribers.lock().push(SubscriberEntry {
            id: queue.id(),
            reliable,
            queue: Arc::downgrade(queue),
        });
        log::debug!("[intra] subscription {} attached to '{}'", queue.id(), self.name);
    }

    pub(crate) fn detach_subscriber(&self, id: HandleId) {
        self.subscribers.lock().retain(|entry| entry.id != id);
    }

    pub(crate) fn attach_publisher(
        &self,
        id: HandleId,
        reliable: bool,
        history: Option<&Arc<PublisherHistory>>,
    ) {
        self.publishers.lock().push(PublisherEntry {
            id,
            reliable,
            history: history.map(Arc::downgrade),
        });
        log::debug!("[intra] publisher {} attached to '{}'", id, self.name);
    }

    pub(crate) fn detach_publisher(&self, id: HandleId) {
        self.publishers.lock().retain(|entry| entry.id != id);
    }

    /// Deliver to every compatible subscription. Returns the number reached.
    pub(crate) fn publish(&self, publisher_reliable: bool, payload: &[u8]) -> usize {
        let targets: Vec<Arc<EntityQueue<Vec<u8>>>> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|entry| entry.queue.strong_count() > 0);
            subscribers
                .iter()
                .filter(|entry| {
                    let compatible = qos_compatible(publisher_reliable, entry.reliable);
                    if !compatible {
                        log::trace!(
                            "[intra] skipping best-effort delivery to reliable subscription {}",
                            entry.id
                        );
                    }
                    compatible
                })
                .filter_map(|entry| entry.queue.upgrade())
                .collect()
        };

        targets
            .iter()
            .filter(|queue| queue.push(payload.to_vec()))
            .count()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|entry| entry.queue.strong_count() > 0)
            .count()
    }

    pub(crate) fn publisher_count(&self) -> usize {
        self.publishers.lock().len()
    }
}

/// Request/response routing point for one service name.
pub(crate) struct ServiceBus {
    name: String,
    type_name: String,
    server: Mutex<Option<(HandleId, Weak<EntityQueue<Envelope>>)>>,
    clients: DashMap<Gid, Weak<EntityQueue<Envelope>>>,
}

impl Bus for ServiceBus {
    fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            server: Mutex::new(None),
            clients: DashMap::new(),
        }
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn is_idle(&self) -> bool {
        !self.has_server() && self.clients.iter().all(|c| c.value().strong_count() == 0)
    }
}

impl ServiceBus {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Register the server. A second live server on the same name is rejected.
    pub(crate) fn attach_server(&self, queue: &Arc<EntityQueue<Envelope>>) -> Result<()> {
        let mut server = self.server.lock();
        if let Some((id, existing)) = server.as_ref() {
            if existing.strong_count() > 0 {
                return Err(Error::InvalidArgument(format!(
                    "service '{}' already has a server ({})",
                    self.name, id
                )));
            }
        }
        *server = Some((queue.id(), Arc::downgrade(queue)));
        log::debug!("[intra] server {} attached to '{}'", queue.id(), self.name);
        Ok(())
    }

    pub(crate) fn detach_server(&self, id: HandleId) {
        let mut server = self.server.lock();
        if matches!(server.as_ref(), Some((current, _)) if *current == id) {
            *server = None;
        }
    }

    pub(crate) fn attach_client(&self, gid: Gid, queue: &Arc<EntityQueue<Envelope>>) {
        self.clients.insert(gid, Arc::downgrade(queue));
    }

    pub(crate) fn detach_client(&self, gid: &Gid) {
        self.clients.remove(gid);
    }

    pub(crate) fn has_server(&self) -> bool {
        self.server
            .lock()
            .as_ref()
            .is_some_and(|(_, queue)| queue.strong_count() > 0)
    }

    /// Enqueue at the server. `false` when no server is listening.
    pub(crate) fn deliver_request(&self, request_id: RequestId, payload: Vec<u8>) -> bool {
        let server = self.server.lock().as_ref().and_then(|(_, q)| q.upgrade());
        match server {
            Some(queue) => queue.push((request_id, payload)),
            None => false,
        }
    }

    /// Route a response to the client that issued `request_id`.
    pub(crate) fn deliver_response(&self, request_id: &RequestId, payload: Vec<u8>) -> bool {
        let client = self
            .clients
            .get(&request_id.client_gid)
            .and_then(|entry| entry.value().upgrade());
        match client {
            Some(queue) => queue.push((*request_id, payload)),
            None => false,
        }
    }
}

/// Domain state - topics and services of one domain
pub(crate) struct DomainState {
    domain_id: DomainId,
    topics: DashMap<String, Arc<TopicBus>>,
    services: DashMap<String, Arc<ServiceBus>>,
}

impl DomainState {
    pub(crate) fn new(domain_id: DomainId) -> Self {
        Self {
            domain_id,
            topics: DashMap::new(),
            services: DashMap::new(),
        }
    }

    pub(crate) fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    pub(crate) fn topic(&self, name: &str, type_name: &str) -> Result<Arc<TopicBus>> {
        bus_for(&self.topics, name, type_name)
    }

    pub(crate) fn service(&self, name: &str, type_name: &str) -> Result<Arc<ServiceBus>> {
        bus_for(&self.services, name, type_name)
    }
}

impl std::fmt::Debug for DomainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainState")
            .field("domain_id", &self.domain_id)
            .field("topics", &self.topics.len())
            .field("services", &self.services.len())
            .finish()
    }
}

/// Global domain registry (singleton)
pub(crate) struct DomainRegistry {
    domains: Mutex<HashMap<DomainId, Weak<DomainState>>>,
}

impl DomainRegistry {
    fn new() -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Get the global registry instance
    pub(crate) fn global() -> &'static DomainRegistry {
        static REGISTRY: OnceLock<DomainRegistry> = OnceLock::new();
        REGISTRY.get_or_init(DomainRegistry::new)
    }

    /// Get or create domain state for a domain ID
    ///
    /// The caller holds the returned Arc to keep the domain alive.
    pub(crate) fn get_or_create(&self, domain_id: DomainId) -> Arc<DomainState> {
        let mut domains = self.domains.lock();

        if let Some(strong) = domains.get(&domain_id).and_then(Weak::upgrade) {
            return strong;
        }

        let state = Arc::new(DomainState::new(domain_id));
        domains.insert(domain_id, Arc::downgrade(&state));
        domains.retain(|_, weak| weak.strong_count() > 0);

        log::info!("[intra] created domain state for domain_id={}", domain_id);

        state
    }

    #[cfg(test)]
    pub(crate) fn get(&self, domain_id: DomainId) -> Option<Arc<DomainState>> {
        self.domains.lock().get(&domain_id).and_then(Weak::upgrade)
    }
}
