// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process middleware.
//!
//! Endpoints created by any [`IntraMiddleware`] on the same domain id match
//! each other by topic or service name, within this process.

mod domain;
mod endpoints;
mod handle;
mod hooks;
mod wait_set;
mod wake;


pub use domain::DomainId;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use self::domain::{DomainRegistry, DomainState};
use self::endpoints::{IntraClient, IntraGuard, IntraPublisher, IntraService, IntraSubscription};
use self::wait_set::IntraWaitSet;
use crate::config::{EnvConfig, DEFAULT_WAIT_SET_CAPACITY};
use crate::error::{Error, Result};
use crate::primitive::{
    ClientPrimitive, EndpointInfo, GuardPrimitive, Middleware, PublisherPrimitive,
    ServicePrimitive, SubscriptionPrimitive, WaitSetPrimitive,
};

/// Identifier reported by [`Middleware::identifier`].
pub const INTRA_IDENTIFIER: &str = "rclcore_intra";

/// Middleware instance bound to one in-process domain.
pub struct IntraMiddleware {
    domain: Arc<DomainState>,
    wait_set_capacity: usize,
    valid: AtomicBool,
}

impl IntraMiddleware {
    pub fn new(domain_id: DomainId) -> Self {
        Self::with_capacity(domain_id, DEFAULT_WAIT_SET_CAPACITY)
    }

    /// `wait_set_capacity` bounds the positions per entity kind of each wait primitive.
    pub fn with_capacity(domain_id: DomainId, wait_set_capacity: usize) -> Self {
        Self {
            domain: DomainRegistry::global().get_or_create(domain_id),
            wait_set_capacity,
            valid: AtomicBool::new(true),
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::with_capacity(config.domain_id, config.wait_set_capacity)
    }

    pub fn domain_id(&self) -> DomainId {
        self.domain.domain_id()
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::disposed("middleware"))
        }
    }
}

impl std::fmt::Debug for IntraMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntraMiddleware")
            .field("domain", &self.domain)
            .field("wait_set_capacity", &self.wait_set_capacity)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl Middleware for IntraMiddleware {
    fn identifier(&self) -> &str {
        INTRA_IDENTIFIER
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn create_wait_set(&self) -> Result<Box<dyn WaitSetPrimitive>> {
        self.ensure_valid()?;
        Ok(Box::new(IntraWaitSet::new(self.wait_set_capacity)))
    }

    fn create_guard_condition(&self) -> Result<Box<dyn GuardPrimitive>> {
        self.ensure_valid()?;
        Ok(Box::new(IntraGuard::new()))
    }

    fn create_publisher(&self, info: &EndpointInfo) -> Result<Box<dyn PublisherPrimitive>> {
        self.ensure_valid()?;
        let bus = self.domain.topic(&info.name, &info.type_name)?;
        Ok(Box::new(IntraPublisher::new(bus, &info.qos)))
    }

    fn create_subscription(&self, info: &EndpointInfo) -> Result<Box<dyn SubscriptionPrimitive>> {
        self.ensure_valid()?;
        let bus = self.domain.topic(&info.name, &info.type_name)?;
        Ok(Box::new(IntraSubscription::new(bus, &info.qos)))
    }

    fn create_client(&self, info: &EndpointInfo) -> Result<Box<dyn ClientPrimitive>> {
        self.ensure_valid()?;
        let bus = self.domain.service(&info.name, &info.type_name)?;
        Ok(Box::new(IntraClient::new(bus, &info.qos)))
    }

    fn create_service(&self, info: &EndpointInfo) -> Result<Box<dyn ServicePrimitive>> {
        self.ensure_valid()?;
        let bus = self.domain.service(&info.name, &info.type_name)?;
        Ok(Box::new(IntraService::new(bus, &info.qos)?))
    }

    fn shutdown(&self) -> Result<()> {
        if self.valid.swap(false, Ordering::AcqRel) {
            log::debug!("[intra] middleware on domain {} shut down", self.domain_id());
        }
        Ok(())
    }
}
