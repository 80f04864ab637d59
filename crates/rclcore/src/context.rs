// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context - owns the middleware and everything created from it.
//!
//! Disposal order: nodes (and through them their endpoints), guard
//! conditions, wait sets, then the middleware itself.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::config::EnvConfig;
use crate::error::{Error, Result};
use crate::guard_condition::GuardCondition;
use crate::node::{Node, NodeInner};
use crate::primitive::intra::{IntraMiddleware, INTRA_IDENTIFIER};
use crate::primitive::Middleware;
use crate::wait_set::{self, WaitSet};
use crate::waitable::{DisposeFlag, Disposable};

pub struct Context {
    config: EnvConfig,
    middleware: Arc<dyn Middleware>,
    nodes: Mutex<Vec<Weak<NodeInner>>>,
    guard_conditions: Mutex<Vec<Weak<GuardCondition>>>,
    wait_sets: Mutex<Vec<Weak<wait_set::Shared>>>,
    disposed: DisposeFlag,
}

impl Context {
    /// Configure from the environment and start the in-process middleware.
    pub fn new() -> Result<Self> {
        let config = EnvConfig::from_env();
        config.apply_log_level();
        if let Some(requested) = &config.rmw_implementation {
            if requested != INTRA_IDENTIFIER {
                log::warn!(
                    "[context] RMW_IMPLEMENTATION={} is not available, using {}",
                    requested,
                    INTRA_IDENTIFIER
                );
            }
        }
        Self::with_config(config)
    }

    pub fn with_config(config: EnvConfig) -> Result<Self> {
        let middleware: Arc<dyn Middleware> = Arc::new(IntraMiddleware::from_config(&config));
        Self::with_middleware(config, middleware)
    }

    /// Use an externally constructed middleware. The context shuts it down on dispose.
    pub fn with_middleware(config: EnvConfig, middleware: Arc<dyn Middleware>) -> Result<Self> {
        if !middleware.is_valid() {
            return Err(Error::disposed(format!("middleware {}", middleware.identifier())));
        }
        log::info!(
            "[context] created on domain {} with {}",
            config.domain_id,
            middleware.identifier()
        );
        Ok(Self {
            config,
            middleware,
            nodes: Mutex::new(Vec::new()),
            guard_conditions: Mutex::new(Vec::new()),
            wait_sets: Mutex::new(Vec::new()),
            disposed: DisposeFlag::default(),
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        &self.middleware
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(Error::disposed("context"));
        }
        Ok(())
    }

    pub fn create_node(&self, name: &str, namespace: &str) -> Result<Node> {
        self.ensure_live()?;
        let node = Node::new(name, namespace, Arc::clone(&self.middleware))?;
        if let Err(e) = self.track(&self.nodes, node.downgrade()) {
            let _ = node.dispose();
            return Err(e);
        }
        Ok(node)
    }

    pub fn create_wait_set(&self) -> Result<WaitSet> {
        self.ensure_live()?;
        let wait_set = WaitSet::new(self.middleware.create_wait_set()?);
        if let Err(e) = self.track(&self.wait_sets, Arc::downgrade(wait_set.shared())) {
            let _ = wait_set.dispose();
            return Err(e);
        }
        Ok(wait_set)
    }

    /// `callback` runs each time the guard condition is processed.
    pub fn create_guard_condition<F>(&self, callback: F) -> Result<Arc<GuardCondition>>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let guard = Arc::new(GuardCondition::new(self.middleware.create_guard_condition()?, callback));
        if let Err(e) = self.track(&self.guard_conditions, Arc::downgrade(&guard)) {
            let _ = guard.dispose();
            return Err(e);
        }
        Ok(guard)
    }

    /// Record `item` for disposal, unless disposal already drained `list`.
    ///
    /// `dispose` sets the flag before draining, so checking it under the
    /// list lock leaves no window where a new item escapes both.
    fn track<T>(&self, list: &Mutex<Vec<Weak<T>>>, item: Weak<T>) -> Result<()> {
        let mut list = list.lock();
        self.ensure_live()?;
        list.retain(|w| w.strong_count() > 0);
        list.push(item);
        Ok(())
    }
}

fn live<T>(list: &Mutex<Vec<Weak<T>>>) -> Vec<Arc<T>> {
    std::mem::take(&mut *list.lock())
        .iter()
        .filter_map(Weak::upgrade)
        .collect()
}

impl Disposable for Context {
    fn dispose(&self) -> Result<()> {
        if !self.disposed.mark() {
            return Ok(());
        }

        let mut first_error = None;
        let mut record = |outcome: Result<()>| {
            if let Err(e) = outcome {
                log::warn!("[context] dispose: {}", e);
                first_error.get_or_insert(e);
            }
        };

        for node in live(&self.nodes) {
            record(node.dispose());
        }
        for guard in live(&self.guard_conditions) {
            record(guard.dispose());
        }
        for wait_set in live(&self.wait_sets) {
            record(wait_set.dispose());
        }
        record(self.middleware.shutdown());

        log::info!("[context] disposed");
        first_error.map_or(Ok(()), Err)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.is_set()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("[context] dispose on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("middleware", &self.middleware.identifier())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
