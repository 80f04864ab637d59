// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node - names endpoints and owns their lifetime.
//!
//! Endpoints are returned as `Arc`s and tracked weakly; disposing the node
//! disposes every endpoint that is still alive.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::primitive::{EndpointInfo, Middleware};
use crate::publisher::Publisher;
use crate::qos::QosProfile;
use crate::service::Service;
use crate::subscription::Subscription;
use crate::waitable::{DisposeFlag, Disposable};

/// Resolve a relative topic or service name against a namespace.
///
/// `"chatter"` in `"/robot"` becomes `"/robot/chatter"`; absolute names are kept.
pub fn expand_name(namespace: &str, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("empty topic or service name".to_string()));
    }
    if name.starts_with('/') {
        return Ok(name.to_string());
    }
    let namespace = namespace.trim_end_matches('/');
    Ok(format!("{}/{}", namespace, name))
}

fn normalize_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub(crate) struct NodeInner {
    name: String,
    namespace: String,
    middleware: Arc<dyn Middleware>,
    endpoints: Mutex<Vec<Weak<dyn Disposable>>>,
    disposed: DisposeFlag,
}

impl NodeInner {
    pub(crate) fn dispose(&self) -> Result<()> {
        if !self.disposed.mark() {
            return Ok(());
        }
        let endpoints = std::mem::take(&mut *self.endpoints.lock());
        let mut first_error = None;
        for endpoint in endpoints.iter().filter_map(Weak::upgrade) {
            if let Err(e) = endpoint.dispose() {
                log::warn!("[node] {}: endpoint dispose failed: {}", self.name, e);
                first_error.get_or_insert(e);
            }
        }
        log::debug!("[node] {} disposed ({} endpoints)", self.name, endpoints.len());
        first_error.map_or(Ok(()), Err)
    }
}

/// Named owner of publishers, subscriptions, clients and services.
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub(crate) fn new(name: &str, namespace: &str, middleware: Arc<dyn Middleware>) -> Result<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::InvalidArgument(format!("invalid node name '{}'", name)));
        }
        Ok(Self {
            inner: Arc::new(NodeInner {
                name: name.to_string(),
                namespace: normalize_namespace(namespace),
                middleware,
                endpoints: Mutex::new(Vec::new()),
                disposed: DisposeFlag::default(),
            }),
        })
    }

    pub(crate) fn downgrade(&self) -> Weak<NodeInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// `namespace/name`.
    pub fn fully_qualified_name(&self) -> String {
        // expand_name only fails on an empty name, which `new` rejects.
        expand_name(&self.inner.namespace, &self.inner.name).unwrap_or_default()
    }

    fn endpoint_info(&self, name: &str, type_name: String, qos: QosProfile) -> Result<EndpointInfo> {
        if self.inner.disposed.is_set() {
            return Err(Error::disposed(format!("node '{}'", self.inner.name)));
        }
        Ok(EndpointInfo {
            node_name: self.inner.name.clone(),
            namespace: self.inner.namespace.clone(),
            name: expand_name(&self.inner.namespace, name)?,
            type_name,
            qos,
        })
    }

    /// Track a new endpoint, or dispose it if the node was disposed since
    /// `endpoint_info` checked.
    ///
    /// The flag is re-read under the list lock that `dispose` drains.
    fn adopt<E: Disposable + 'static>(&self, endpoint: Arc<E>) -> Result<Arc<E>> {
        let mut endpoints = self.inner.endpoints.lock();
        if self.inner.disposed.is_set() {
            drop(endpoints);
            let _ = endpoint.dispose();
            return Err(Error::disposed(format!("node '{}'", self.inner.name)));
        }
        endpoints.retain(|e| e.strong_count() > 0);
        let weak: Weak<dyn Disposable> = Arc::downgrade(&endpoint) as Weak<dyn Disposable>;
        endpoints.push(weak);
        Ok(endpoint)
    }

    pub fn create_publisher<T: Message>(&self, topic: &str, qos: QosProfile) -> Result<Arc<Publisher<T>>> {
        let info = self.endpoint_info(topic, T::type_name().to_string(), qos)?;
        let primitive = self.inner.middleware.create_publisher(&info)?;
        let publisher = self.adopt(Arc::new(Publisher::new(info.name, primitive)))?;
        log::debug!("[node] {} created publisher on {}", self.inner.name, publisher.topic());
        Ok(publisher)
    }

    pub fn create_subscription<T, F>(
        &self,
        topic: &str,
        qos: QosProfile,
        callback: F,
    ) -> Result<Arc<Subscription<T>>>
    where
        T: Message,
        F: Fn(T) + Send + Sync + 'static,
    {
        let info = self.endpoint_info(topic, T::type_name().to_string(), qos)?;
        let primitive = self.inner.middleware.create_subscription(&info)?;
        let subscription =
            self.adopt(Arc::new(Subscription::new(info.name.clone(), primitive, callback)))?;
        log::debug!("[node] {} created subscription on {}", self.inner.name, info.name);
        Ok(subscription)
    }

    pub fn create_client<Req: Message, Resp: Message>(
        &self,
        service: &str,
        qos: QosProfile,
    ) -> Result<Arc<Client<Req, Resp>>> {
        let type_name = format!("{}/{}", Req::type_name(), Resp::type_name());
        let info = self.endpoint_info(service, type_name, qos)?;
        let primitive = self.inner.middleware.create_client(&info)?;
        let client = self.adopt(Arc::new(Client::new(info.name.clone(), primitive)))?;
        log::debug!("[node] {} created client for {}", self.inner.name, info.name);
        Ok(client)
    }

    pub fn create_service<Req, Resp, F>(
        &self,
        service: &str,
        qos: QosProfile,
        callback: F,
    ) -> Result<Arc<Service<Req, Resp>>>
    where
        Req: Message,
        Resp: Message,
        F: Fn(Req) -> Resp + Send + Sync + 'static,
    {
        let type_name = format!("{}/{}", Req::type_name(), Resp::type_name());
        let info = self.endpoint_info(service, type_name, qos)?;
        let primitive = self.inner.middleware.create_service(&info)?;
        let server = self.adopt(Arc::new(Service::new(info.name.clone(), primitive, callback)))?;
        log::debug!("[node] {} created service {}", self.inner.name, info.name);
        Ok(server)
    }

    /// Number of endpoints created by this node that are still alive.
    pub fn endpoint_count(&self) -> usize {
        self.inner
            .endpoints
            .lock()
            .iter()
            .filter(|e| e.strong_count() > 0)
            .count()
    }
}

impl Disposable for Node {
    /// Dispose every live endpoint created by this node.
    fn dispose(&self) -> Result<()> {
        self.inner.dispose()
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.is_set()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Err(e) = self.inner.dispose() {
            log::warn!("[node] dispose on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.inner.name)
            .field("namespace", &self.inner.namespace)
            .field("disposed", &self.inner.disposed.is_set())
            .finish()
    }
}
