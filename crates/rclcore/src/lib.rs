// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rclcore - ROS 2 style client library core
//!
//! Readiness multiplexing ([`WaitSet`]) and request/response correlation
//! ([`PendingRequestTable`]) for a ROS 2 client binding, on top of a narrow
//! middleware interface ([`primitive`]). An in-process middleware
//! ([`primitive::intra`]) ships with the crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rclcore::{Context, QosProfile, Result};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let context = Context::new()?;
//!     let node = context.create_node("adder", "/")?;
//!
//!     let server = node.create_service::<i64, i64, _>("/double", QosProfile::services_default(), |x| x * 2)?;
//!     let client = node.create_client::<i64, i64>("/double", QosProfile::services_default())?;
//!
//!     let mut wait_set = context.create_wait_set()?;
//!     wait_set.add_service(server.clone())?;
//!     wait_set.add_client(client.clone())?;
//!
//!     let mut response = client.call_async(&21)?;
//!     while response.try_result().is_none() {
//!         wait_set.wait(Some(Duration::from_secs(1)))?.ready()?.process_all()?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  Context -> Node -> Publisher / Subscription / Client / ... |
//! +-------------------------------------------------------------+
//! |  WaitSet -> WaitResult -> ReadySet        PendingRequestTable |
//! +-------------------------------------------------------------+
//! |  primitive: Middleware, WaitSetPrimitive, EntityHandle, ... |
//! +-------------------------------------------------------------+
//! |  primitive::intra: in-process domains, buses, queues        |
//! +-------------------------------------------------------------+
//! ```

/// Service client and request/response correlation.
pub mod client;
/// ROS time sources.
pub mod clock;
/// Runtime configuration from environment variables.
pub mod config;
/// Owner of the middleware and of everything created from it.
pub mod context;
/// Crate-wide error type.
pub mod error;
/// Application-triggered wake-up signal.
pub mod guard_condition;
/// Message encode/decode contract.
pub mod message;
/// Named endpoint factory.
pub mod node;
/// Middleware interface and the in-process implementation.
pub mod primitive;
/// Typed publisher.
pub mod publisher;
/// `QoS` profiles and ROS 2 presets.
pub mod qos;
/// Service server.
pub mod service;
/// Typed subscription.
pub mod subscription;
/// Readiness multiplexer.
pub mod wait_set;
/// Capabilities shared by waitable endpoints.
pub mod waitable;

pub use client::{Client, PendingRequestTable, ResponseFuture};
pub use clock::{Clock, ClockKind, RosTime};
pub use config::EnvConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use guard_condition::GuardCondition;
pub use message::Message;
pub use node::Node;
pub use primitive::{EntityKind, HandleId, Middleware, RequestId};
pub use publisher::Publisher;
pub use qos::{Durability, History, QosPreset, QosProfile, Reliability};
pub use service::Service;
pub use subscription::Subscription;
pub use wait_set::{ReadySet, WaitResult, WaitSet};
pub use waitable::{ClientBase, Disposable, ServiceBase, SubscriptionBase, Waitable};
